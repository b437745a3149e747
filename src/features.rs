use std::fmt;
use std::str::FromStr;

/// Optional run-time behaviour, selected with `--features`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// Halt on a trap vector with no handler instead of ignoring it.
    pub strict_traps: bool,
    /// Log every executed instruction to stderr.
    pub trace: bool,
}

impl Features {
    fn flags(&self) -> [(&'static str, bool); 2] {
        [("strict-traps", self.strict_traps), ("trace", self.trace)]
    }
}

impl FromStr for Features {
    type Err = String;
    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let mut features = Self::default();
        for word in string.split(',') {
            let value = match word.trim() {
                "" => continue,
                "strict-traps" => &mut features.strict_traps,
                "trace" => &mut features.trace,
                _ => return Err(format!("Unknown feature '{}'", word)),
            };
            if *value {
                return Err(format!("Cannot specify feature '{}' twice", word));
            }
            *value = true;
        }
        Ok(features)
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut has_any_feature = false;
        for (name, value) in self.flags() {
            if !value {
                continue;
            }
            if has_any_feature {
                write!(f, ",")?;
            }
            write!(f, "{}", name)?;
            has_any_feature = true;
        }
        Ok(())
    }
}
