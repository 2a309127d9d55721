use super::{Migration, SimpleSqlMigration};

pub fn migration() -> impl Migration {
    SimpleSqlMigration {
        serial_number: 0,
        sql: vec![
            // user_id is an opaque string handed to us by the auth collaborator; we never
            // issue or validate it ourselves.
            r#"
            CREATE TABLE users (
                id TEXT PRIMARY KEY CHECK (char_length(id) <= 100),
                balance_sats BIGINT NOT NULL CHECK (balance_sats >= 0)
            )"#,
            r#"
            CREATE TABLE withdraw_requests (
                k1 TEXT PRIMARY KEY CHECK (char_length(k1) = 64),
                user_id TEXT NOT NULL REFERENCES users,
                clearnet_url TEXT NOT NULL,
                lnurl TEXT NOT NULL,
                lnurlw TEXT NOT NULL,
                status TEXT NOT NULL,
                reason TEXT,
                payment_hash TEXT CHECK (char_length(payment_hash) = 64),
                bolt11 TEXT CHECK (char_length(bolt11) <= 1023),
                amount BIGINT,
                destination TEXT,
                ts_created TIMESTAMP WITH TIME ZONE NOT NULL,
                ts_invoice TIMESTAMP WITH TIME ZONE,
                ts_paid TIMESTAMP WITH TIME ZONE,
                redeemed BOOLEAN NOT NULL DEFAULT FALSE
            )"#,
            r#"CREATE UNIQUE INDEX withdraw_requests_payment_hash ON withdraw_requests (payment_hash)
                WHERE payment_hash IS NOT NULL"#,
            r#"CREATE INDEX withdraw_requests_user_created ON withdraw_requests (user_id, ts_created)"#,
            r#"
            CREATE TABLE deposit_requests (
                payment_hash TEXT PRIMARY KEY CHECK (char_length(payment_hash) = 64),
                user_id TEXT NOT NULL REFERENCES users,
                status TEXT NOT NULL,
                amount_sats BIGINT NOT NULL,
                ts_created TIMESTAMP WITH TIME ZONE NOT NULL
            )"#,
            // Shared table for both withdraw-side and deposit-side decoded invoices; `direction`
            // tells which side created the row, since both lifecycles key on payment_hash.
            r#"
            CREATE TABLE invoices (
                payment_hash TEXT PRIMARY KEY CHECK (char_length(payment_hash) = 64),
                direction TEXT NOT NULL,
                bolt11 TEXT NOT NULL CHECK (char_length(bolt11) <= 1023),
                destination TEXT NOT NULL,
                num_satoshis BIGINT NOT NULL,
                timestamp TIMESTAMP WITH TIME ZONE NOT NULL,
                expiry BIGINT NOT NULL,
                description TEXT,
                description_hash TEXT,
                fallback_addr TEXT,
                cltv_expiry BIGINT NOT NULL,
                route_hints TEXT NOT NULL,
                payment_addr TEXT,
                features TEXT,
                preimage TEXT,
                state TEXT
            )"#,
            r#"
            CREATE TABLE payments (
                payment_hash TEXT PRIMARY KEY CHECK (char_length(payment_hash) = 64),
                user_id TEXT NOT NULL REFERENCES users,
                preimage TEXT,
                value_sat BIGINT NOT NULL,
                status TEXT NOT NULL,
                fee_sat BIGINT,
                ts_create TIMESTAMP WITH TIME ZONE NOT NULL,
                failure_reason TEXT
            )"#,
            // Present only while a withdraw payment is in flight; deleted by finalize_payment or
            // fail_payment. Invariant 1 follows from the FK: every row here has a withdraw
            // request sharing its payment_hash.
            r#"
            CREATE TABLE locked_balances (
                payment_hash TEXT PRIMARY KEY REFERENCES payments,
                user_id TEXT NOT NULL REFERENCES users,
                amount_sats BIGINT NOT NULL
            )"#,
            // Appended once per settled payment_hash; the unique index is what makes
            // finalize_payment/deposit_finalize idempotent under at-least-once stream delivery.
            r#"
            CREATE TABLE transactions (
                id BIGSERIAL PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users,
                payment_hash TEXT NOT NULL,
                direction TEXT NOT NULL,
                amount_sats BIGINT NOT NULL,
                ts_create TIMESTAMP WITH TIME ZONE NOT NULL
            )"#,
            r#"CREATE UNIQUE INDEX transactions_payment_hash_direction
                ON transactions (payment_hash, direction)"#,
        ],
    }
}
