use std::fmt;
use std::path::PathBuf;
use std::process::Output;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// A contract as forge addresses it, `[path:]Name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSpec {
    pub path: Option<PathBuf>,
    pub name: String,
}

impl ContractSpec {
    pub fn path_name(path: PathBuf, name: impl ToString) -> Self {
        Self {
            path: Some(path),
            name: name.to_string(),
        }
    }

    pub fn name(name: impl ToString) -> Self {
        Self {
            path: None,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ContractSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = self.path.as_deref() {
            write!(f, "{}:{}", path.display(), self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl FromStr for ContractSpec {
    type Err = eyre::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let spec = match s.rsplit_once(':') {
            Some((path, name)) => {
                if path.is_empty() {
                    eyre::bail!("Empty contract path in {s:?}");
                }
                Self::path_name(PathBuf::from(path), name)
            }
            None => Self::name(s),
        };

        if spec.name.is_empty() {
            eyre::bail!("Missing contract name in {s:?}");
        }

        Ok(spec)
    }
}

impl Serialize for ContractSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

pub(super) fn check_output(command: &str, output: &Output) -> eyre::Result<()> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = match output.status.code() {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        eyre::bail!("{command} failed ({code}): {}", stderr.trim());
    }

    Ok(())
}

pub(super) fn strip_non_json(s: &str) -> &str {
    if let Some(last_closing_brace) = s.rfind(['}', ']']) {
        &s[..=last_closing_brace]
    } else {
        s
    }
}
