use std::io::Write;

/// Level used when neither `--debug` nor `RUST_LOG` says otherwise.
pub const DEFAULT_LEVEL: &str = "info";

/// Initialize the global logger for the server. `RUST_LOG` takes precedence over `debug`.
pub fn init_logging(debug: bool) {
    init_logging_with_default(debug, DEFAULT_LEVEL);
}

/// Same format as [`init_logging`] with a caller-chosen fallback level, so the
/// terminal client can stay quieter than the server.
pub fn init_logging_with_default(debug: bool, default_level: &str) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(filter_for(debug, default_level)),
    )
    .format(|buf, record| {
        writeln!(
            buf,
            "[{}] {} [{}] {} - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    })
    .init();
}

fn filter_for(debug: bool, default_level: &str) -> &str {
    if debug {
        "debug"
    } else {
        default_level
    }
}
