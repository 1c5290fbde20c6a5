use crate::layout::ServiceDirs;
use serde::{Deserialize, Serialize};

/// The runit control program (`sv`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Supervisor {
    /// Program name or path
    pub program: String,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self {
            program: "sv".to_string(),
        }
    }
}

/// One command in an enable or disable sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub argv: Vec<String>,
    /// `sv up`/`sv down` may fail on an unsupervised service; the link
    /// change is what enables or disables it.
    pub best_effort: bool,
}

impl Step {
    fn required(argv: Vec<String>) -> Self {
        Self {
            argv,
            best_effort: false,
        }
    }

    fn best_effort(argv: Vec<String>) -> Self {
        Self {
            argv,
            best_effort: true,
        }
    }
}

impl Supervisor {
    /// `sv <verb> <name>`
    pub fn control(&self, verb: &str, name: &str) -> Vec<String> {
        vec![self.program.clone(), verb.to_string(), name.to_string()]
    }
}

/// Commands that enable a service: link the definition, then bring it up.
pub fn enable_steps(dirs: &ServiceDirs, sv: &Supervisor, name: &str) -> Vec<Step> {
    vec![
        Step::required(vec![
            "ln".to_string(),
            "-sf".to_string(),
            dirs.definition_path(name).to_string_lossy().into_owned(),
            dirs.link_path(name).to_string_lossy().into_owned(),
        ]),
        Step::best_effort(sv.control("up", name)),
    ]
}

/// Commands that disable a service: bring it down, then drop the link.
pub fn disable_steps(dirs: &ServiceDirs, sv: &Supervisor, name: &str) -> Vec<Step> {
    vec![
        Step::best_effort(sv.control("down", name)),
        Step::required(vec![
            "rm".to_string(),
            "-f".to_string(),
            dirs.link_path(name).to_string_lossy().into_owned(),
        ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_links_before_up() {
        let steps = enable_steps(&ServiceDirs::default(), &Supervisor::default(), "sshd");
        let argvs: Vec<_> = steps.iter().map(|s| s.argv.clone()).collect();
        assert_eq!(
            argvs,
            vec![
                vec!["ln", "-sf", "/etc/sv/sshd", "/var/service/sshd"],
                vec!["sv", "up", "sshd"],
            ]
        );
        assert!(!steps[0].best_effort);
        assert!(steps[1].best_effort);
    }

    #[test]
    fn disable_downs_before_unlink() {
        let dirs = ServiceDirs::new("/srv/sv", "/run/runit/service");
        let steps = disable_steps(&dirs, &Supervisor::default(), "cron");
        let argvs: Vec<_> = steps.iter().map(|s| s.argv.clone()).collect();
        assert_eq!(
            argvs,
            vec![
                vec!["sv", "down", "cron"],
                vec!["rm", "-f", "/run/runit/service/cron"],
            ]
        );
        assert!(steps[0].best_effort);
        assert!(!steps[1].best_effort);
    }
}
