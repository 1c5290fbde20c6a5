//! Command lines for the XBPS tools.
//!
//! Only argument vectors are built here. Mutating commands need root, so the
//! caller wraps them with whatever elevation broker it uses.

use crate::types::{Directive, Tools};
use execkit::Invocation;

/// `xbps-query -l`: list installed packages.
pub fn list_installed(tools: &Tools) -> Invocation {
    Invocation::new(&tools.query).arg("-l")
}

/// `xbps-query -R -s <query>`: search remote repositories.
pub fn search(tools: &Tools, query: &str) -> Invocation {
    Invocation::new(&tools.query).args(["-R", "-s", query])
}

/// `xbps-install -Sy <name>`: sync repositories and install without prompting.
pub fn install(tools: &Tools, name: &str) -> Vec<String> {
    vec![tools.install.clone(), "-Sy".to_string(), name.to_string()]
}

/// `xbps-remove -Ry <name>`: remove recursively without prompting.
pub fn remove(tools: &Tools, name: &str) -> Vec<String> {
    vec![tools.remove.clone(), "-Ry".to_string(), name.to_string()]
}

/// Argument vector for a package directive.
pub fn for_directive(tools: &Tools, directive: Directive, name: &str) -> Vec<String> {
    match directive {
        Directive::Install => install(tools, name),
        Directive::Remove => remove(tools, name),
    }
}
