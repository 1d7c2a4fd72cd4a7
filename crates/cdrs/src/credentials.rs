use cdr_common::LogicalName;
use std::path::Path;
use tracing::{info, warn};

/// One (logical name, secret) entry. Immutable for the process.
#[derive(Debug, Clone)]
struct Credential {
    name: LogicalName,
    pass: String,
}

/// Read-only credential store consulted during authentication.
///
/// Names are canonicalized on load, so lookups are case-insensitive;
/// secrets are compared verbatim.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: Vec<Credential>,
}

impl CredentialStore {
    /// Loads credentials from a file with one `CAMPUS:DEPT:PASS`
    /// entry per line. Blank lines and `#` comments are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line does
    /// not have exactly three `:`-separated non-empty fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let mut entries = Vec::new();
        for (lineno, line) in data.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(campus), Some(dept), Some(pass))
                    if !campus.is_empty() && !dept.is_empty() && !pass.is_empty() =>
                {
                    entries.push(Credential {
                        name: LogicalName::new(campus, dept),
                        pass: pass.to_string(),
                    });
                }
                _ => anyhow::bail!(
                    "bad credential entry at {}:{}",
                    path.display(),
                    lineno + 1
                ),
            }
        }
        info!("loaded {} credentials from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    /// Built-in demo table, used when no credentials file is given.
    #[must_use]
    pub fn builtin() -> Self {
        warn!("using built-in demo credential table (not for production)");
        let table = [
            ("LAHORE", "CS", "LHR_CS_123"),
            ("LAHORE", "ADMIN", "LHR_ADM_123"),
            ("CHINIOT", "CS", "CH_CS_123"),
            ("KARACHI", "CS", "KHI_CS_123"),
            ("ISLAMABAD", "CS", "ISB_CS_123"),
            ("MULTAN", "ADMISSIONS", "MTN_ADM_123"),
        ];
        Self {
            entries: table
                .into_iter()
                .map(|(campus, dept, pass)| Credential {
                    name: LogicalName::new(campus, dept),
                    pass: pass.to_string(),
                })
                .collect(),
        }
    }

    /// Builds a store from (campus, dept, pass) tuples.
    #[must_use]
    pub fn from_entries(entries: &[(&str, &str, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(campus, dept, pass)| Credential {
                    name: LogicalName::new(campus, dept),
                    pass: (*pass).to_string(),
                })
                .collect(),
        }
    }

    /// Returns whether the (name, secret) pair matches an entry.
    #[must_use]
    pub fn verify(&self, name: &LogicalName, pass: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.name == *name && entry.pass == pass)
    }

    /// Number of entries in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
