use std::env;
use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Auto,   // Detect based on terminal
    Always, // Force colors on
    Never,  // Force colors off
}

impl ColorMode {
    pub fn should_use_color(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => detect_color_support(),
        }
    }

    /// Resolve from `NO_COLOR` / `CLICOLOR` / `CLICOLOR_FORCE`.
    pub fn from_env() -> Self {
        let mut mode = Self::Auto;

        // Check NO_COLOR environment variable (per no-color.org standard)
        if env::var("NO_COLOR").is_ok() {
            mode = Self::Never;
        }

        if let Ok(val) = env::var("CLICOLOR") {
            if val == "0" {
                mode = Self::Never;
            }
        }

        if let Ok(val) = env::var("CLICOLOR_FORCE") {
            if val == "1" {
                mode = Self::Always;
            }
        }

        mode
    }

    /// Make `colored` honour this mode for the rest of the process.
    pub fn apply(self) {
        colored::control::set_override(self.should_use_color());
    }
}

/// `--plain` forces colors off; otherwise the environment decides.
pub fn color_mode(plain: bool) -> ColorMode {
    if plain {
        ColorMode::Never
    } else {
        ColorMode::from_env()
    }
}

fn detect_color_support() -> bool {
    // Check if we're in a dumb terminal
    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    std::io::stdout().is_terminal()
}
