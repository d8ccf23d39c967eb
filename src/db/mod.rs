pub mod access_log;

use crate::{service::filesystem::data_dir_file_path, Result};
use deadpool_sqlite::{Config, Hook, Pool, Runtime};

pub fn pool() -> Result<Pool> {
    let pool_size = std::thread::available_parallelism()
        .map(|n| n.get() * 2)
        .unwrap_or(8);
    let pool = Config::new(data_dir_file_path("access_logs.db")?)
        .builder(Runtime::Tokio1)?
        .max_size(pool_size)
        .post_create(Hook::Fn(Box::new(|conn, _| {
            let conn = conn.lock().unwrap();
            conn.pragma_update(None, "journal_mode", "WAL").unwrap();
            conn.pragma_update(None, "synchronous", "NORMAL").unwrap();
            access_log::migrations::migrate(&conn).unwrap();
            Ok(())
        })))
        .build()?;
    Ok(pool)
}

#[cfg(test)]
pub mod test {
    use super::access_log;
    use deadpool_sqlite::{Config, Hook, Pool, Runtime};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static MEM_DB_COUNTER: AtomicUsize = AtomicUsize::new(1);

    // Named shared-cache memory databases so every pooled connection sees
    // the same tables. The pool keeps connections alive between interacts.
    pub fn pool() -> Pool {
        let uri = format!(
            "file:testdb_{}?mode=memory&cache=shared",
            MEM_DB_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        Config::new(uri)
            .builder(Runtime::Tokio1)
            .unwrap()
            .max_size(2)
            .post_create(Hook::Fn(Box::new(|conn, _| {
                let conn = conn.lock().unwrap();
                access_log::migrations::migrate(&conn).unwrap();
                Ok(())
            })))
            .build()
            .unwrap()
    }

    pub fn conn() -> rusqlite::Connection {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        access_log::migrations::migrate(&conn).unwrap();
        conn
    }
}
