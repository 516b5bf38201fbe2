use tracing_subscriber::EnvFilter;

/// Level used when neither `--verbose` nor `RUST_LOG` says otherwise.
const DEFAULT_DIRECTIVE: &str = "warn";
const VERBOSE_DIRECTIVE: &str = "ecoswap=debug,ecoswap_core=debug,tower_http=debug,warn";

fn env_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let directive = if verbose {
        VERBOSE_DIRECTIVE
    } else {
        rust_log.unwrap_or(DEFAULT_DIRECTIVE)
    };
    EnvFilter::try_new(directive)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
        .add_directive(
            "hyper=warn"
                .parse()
                .unwrap_or_else(|_| tracing::Level::WARN.into()),
        )
}

/// Install the global fmt subscriber writing to stderr, so stdout stays
/// clean for tables and `--json` output.
pub fn init(verbose: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}
