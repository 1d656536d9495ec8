use env_logger::{Builder, Env};
use log::error;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт: warn (stdout остаётся чистым для вывода).
    // Пример: RUST_LOG=debug pg_controldata show -D ./data
    Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = pg_controldata::cli::run() {
        error!("{:#}", e);
        // 2: можно повторить (рваное чтение / таймаут), 1: всё остальное.
        let code = if pg_controldata::cli::is_retryable(&e) { 2 } else { 1 };
        std::process::exit(code);
    }
}
