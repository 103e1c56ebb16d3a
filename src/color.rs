/// Whether human-readable output should be wrapped in ANSI escapes,
/// resolved once from the environment at process start and threaded
/// through as plain configuration rather than read again per call.
#[derive(Debug, Clone, Copy)]
pub struct ColorConfig {
    enabled: bool,
}

impl ColorConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: detect_color(),
        }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn bold(&self, s: &str) -> String {
        self.wrap("\u{1b}[1m", s)
    }

    pub fn dim(&self, s: &str) -> String {
        self.wrap("\u{1b}[2m", s)
    }

    fn wrap(&self, code: &str, s: &str) -> String {
        if self.enabled {
            format!("{code}{s}\u{1b}[0m")
        } else {
            s.to_string()
        }
    }
}

fn detect_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    match std::env::var("TERM") {
        Ok(term) => !term.is_empty() && term != "dumb",
        Err(_) => false,
    }
}
