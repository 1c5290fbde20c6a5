//! Real XBPS backend using `xbps-query`.

use crate::backend::Backend;
use crate::command;
use crate::error::{Error, Result};
use crate::parse;
use crate::types::{InstalledPackage, NameParser, SearchHit, Tools};
use execkit::{CancelToken, Captured, Exit, Invocation};
use std::time::Duration;

/// Default deadline for a single query.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Backend that runs the real XBPS tools.
#[derive(Debug, Clone)]
pub struct XbpsBackend {
    tools: Tools,
    parser: NameParser,
    timeout: Option<Duration>,
}

impl XbpsBackend {
    /// Create a backend with the default query deadline.
    pub fn new(tools: Tools, parser: NameParser) -> Self {
        Self {
            tools,
            parser,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Set the per-query deadline (`None` waits forever).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The tool names this backend runs.
    pub fn tools(&self) -> &Tools {
        &self.tools
    }

    /// Run a query and return its stdout lines.
    ///
    /// With `lenient`, a silent non-zero exit counts as no output.
    fn query(&self, inv: Invocation, lenient: bool) -> Result<Vec<String>> {
        let inv = inv.with_timeout(self.timeout);
        let captured = execkit::capture(&inv, &CancelToken::new()).map_err(|e| {
            if e.is_not_found() {
                Error::XbpsNotFound {
                    tool: inv.program.clone(),
                }
            } else {
                Error::Io(e)
            }
        })?;

        check(&inv, captured, lenient)
    }
}

fn check(inv: &Invocation, captured: Captured, lenient: bool) -> Result<Vec<String>> {
    match captured.exit {
        Exit::Code(0) => Ok(captured.stdout),
        Exit::TimedOut => Err(Error::TimedOut {
            tool: inv.program.clone(),
        }),
        Exit::Cancelled => Err(Error::Cancelled),
        // A search with no matches exits non-zero without saying anything.
        Exit::Code(_) if lenient && captured.stdout.is_empty() && captured.stderr.is_empty() => {
            log::debug!("{inv} produced no output");
            Ok(Vec::new())
        }
        exit => Err(Error::CommandFailed {
            message: format!("{inv}: {exit}"),
            stderr: captured.stderr_text(),
        }),
    }
}

impl Backend for XbpsBackend {
    fn list_installed(&self) -> Result<Vec<InstalledPackage>> {
        let lines = self.query(command::list_installed(&self.tools), false)?;
        let installed = parse::parse_installed(lines.iter().map(String::as_str), self.parser);
        log::debug!("{} installed packages", installed.len());
        Ok(installed)
    }

    fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let lines = self.query(command::search(&self.tools, query), true)?;
        Ok(parse::parse_search(
            lines.iter().map(String::as_str),
            self.parser,
        ))
    }
}
