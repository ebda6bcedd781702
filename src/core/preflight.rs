use crate::domain::model::PortCheckResult;
use crate::domain::ports::{ListenerTable, ToolLocator};
use crate::utils::error::{Result, StackError};

/// Environment checks that run before anything is started.
///
/// The port check is best-effort: a port found free here can still be taken
/// by another process before the stack binds it.
pub struct PreflightChecker {
    tools: Box<dyn ToolLocator>,
    listeners: Box<dyn ListenerTable>,
}

impl PreflightChecker {
    pub fn new(tools: Box<dyn ToolLocator>, listeners: Box<dyn ListenerTable>) -> Self {
        Self { tools, listeners }
    }

    pub fn check_tools<I, S>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            match self.tools.locate(name) {
                Some(path) => tracing::debug!("🔧 Found {} at {}", name, path.display()),
                None => {
                    tracing::error!("❌ Required tool '{}' not found", name);
                    return Err(StackError::MissingTool {
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Fails on the first port that already has a listener.
    pub fn check_ports_free<I>(&self, ports: I) -> Result<Vec<PortCheckResult>>
    where
        I: IntoIterator<Item = u16>,
    {
        let mut results = Vec::new();
        for port in ports {
            let free = !self.listeners.is_listening(port)?;
            if !free {
                tracing::error!("❌ Port {} is already bound by another process", port);
                return Err(StackError::PortInUse { port });
            }
            tracing::debug!("🔌 Port {} is free", port);
            results.push(PortCheckResult { port, free });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    struct FakeTools(HashSet<&'static str>);

    impl ToolLocator for FakeTools {
        fn locate(&self, name: &str) -> Option<PathBuf> {
            self.0.contains(name).then(|| PathBuf::from("/usr/bin").join(name))
        }
    }

    struct FakeListeners(HashSet<u16>);

    impl ListenerTable for FakeListeners {
        fn is_listening(&self, port: u16) -> Result<bool> {
            Ok(self.0.contains(&port))
        }
    }

    fn checker(tools: &[&'static str], busy: &[u16]) -> PreflightChecker {
        PreflightChecker::new(
            Box::new(FakeTools(tools.iter().copied().collect())),
            Box::new(FakeListeners(busy.iter().copied().collect())),
        )
    }

    #[test]
    fn test_all_tools_present() {
        let checker = checker(&["docker", "curl"], &[]);
        assert!(checker.check_tools(["docker", "curl"]).is_ok());
    }

    #[test]
    fn test_missing_tool_is_named() {
        let checker = checker(&["docker"], &[]);
        let err = checker.check_tools(["docker", "node"]).unwrap_err();
        assert!(matches!(err, StackError::MissingTool { ref name } if name == "node"));
    }

    #[test]
    fn test_free_ports_are_reported() {
        let checker = checker(&[], &[8080]);
        let results = checker.check_ports_free([80, 5000]).unwrap();
        assert_eq!(
            results,
            vec![
                PortCheckResult { port: 80, free: true },
                PortCheckResult { port: 5000, free: true },
            ]
        );
    }

    #[test]
    fn test_bound_port_fails() {
        let checker = checker(&[], &[5000]);
        let err = checker.check_ports_free([80, 5000, 27017]).unwrap_err();
        assert!(matches!(err, StackError::PortInUse { port: 5000 }));
    }
}
