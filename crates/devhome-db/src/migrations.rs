use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            first_name  TEXT NOT NULL,
            last_name   TEXT NOT NULL DEFAULT '',
            age         INTEGER CHECK (age IS NULL OR age >= 18),
            gender      TEXT CHECK (gender IS NULL OR gender IN ('male', 'female', 'others')),
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        -- pair_low/pair_high hold the two user ids in sorted order, so the
        -- UNIQUE constraint covers both directions of a pair.
        CREATE TABLE IF NOT EXISTS connections (
            id              TEXT PRIMARY KEY,
            from_user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            to_user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            pair_low        TEXT NOT NULL,
            pair_high       TEXT NOT NULL,
            status          TEXT NOT NULL
                CHECK (status IN ('pending', 'interested', 'ignored', 'accepted', 'rejected')),
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL,
            CHECK (from_user_id <> to_user_id),
            CHECK (pair_low < pair_high),
            UNIQUE (pair_low, pair_high)
        );

        CREATE INDEX IF NOT EXISTS idx_connections_incoming
            ON connections(to_user_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
