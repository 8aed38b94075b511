// ABOUTME: Shared logging setup for the keyper binary
// ABOUTME: Translates verbosity flags into a tracing level and installs a stderr subscriber

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Net verbosity requested on the command line.
///
/// `loud` counts `-v` flags, `quiet` counts `-q` flags and `debug` is the
/// hidden `--debug` switch that always wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verbosity {
    pub loud: u8,
    pub quiet: u8,
    pub debug: bool,
}

impl Verbosity {
    pub fn new(loud: u8, quiet: u8, debug: bool) -> Self {
        Self { loud, quiet, debug }
    }

    /// Level ladder: -qq off, -q error, default warn, -v info, -vv debug, --debug trace.
    pub fn level(&self) -> LevelFilter {
        if self.debug {
            return LevelFilter::TRACE;
        }

        let step = 2i16 + i16::from(self.loud) - i16::from(self.quiet);
        match step {
            i16::MIN..=0 => LevelFilter::OFF,
            1 => LevelFilter::ERROR,
            2 => LevelFilter::WARN,
            3 => LevelFilter::INFO,
            4 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

/// Standard logging to stderr. RUST_LOG directives are layered on top of the
/// level derived from `verbosity`.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.level().into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_init() {
        let _ = super::init as fn(Verbosity);
    }

    #[test]
    fn default_is_warn() {
        assert_eq!(Verbosity::default().level(), LevelFilter::WARN);
    }

    #[test]
    fn loud_flags_raise_level() {
        assert_eq!(Verbosity::new(1, 0, false).level(), LevelFilter::INFO);
        assert_eq!(Verbosity::new(2, 0, false).level(), LevelFilter::DEBUG);
        assert_eq!(Verbosity::new(5, 0, false).level(), LevelFilter::TRACE);
    }

    #[test]
    fn quiet_flags_lower_level() {
        assert_eq!(Verbosity::new(0, 1, false).level(), LevelFilter::ERROR);
        assert_eq!(Verbosity::new(0, 2, false).level(), LevelFilter::OFF);
        assert_eq!(Verbosity::new(0, 9, false).level(), LevelFilter::OFF);
    }

    #[test]
    fn debug_overrides_quiet() {
        assert_eq!(Verbosity::new(0, 3, true).level(), LevelFilter::TRACE);
    }
}
