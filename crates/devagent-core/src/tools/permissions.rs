//! Per-role tool permissions

use super::{Capability, CommandOutput, SharedTools, ToolError};
use crate::workflow::Role;
use std::time::Duration;

/// Capabilities a role may use
pub fn permissions_for(role: Role) -> &'static [Capability] {
    use Capability::*;

    match role {
        Role::Retriever => &[Read, Find, Search, Run],
        Role::Editor => &[Read, Write, Run],
        Role::Executor => &[Run, Read],
        Role::Verifier => &[Read, Run],
        Role::PrBot => &[Run, Read],
        Role::Dispatcher | Role::Reflector | Role::End => &[],
    }
}

/// Tool handle bound to one role
///
/// Every call is checked against [`permissions_for`] before it reaches the
/// underlying tools.
#[derive(Clone)]
pub struct ScopedTools {
    role: Role,
    inner: SharedTools,
}

impl ScopedTools {
    pub fn new(role: Role, inner: SharedTools) -> Self {
        Self { role, inner }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    fn check(&self, capability: Capability) -> Result<(), ToolError> {
        if permissions_for(self.role).contains(&capability) {
            Ok(())
        } else {
            tracing::warn!(role = %self.role, %capability, "tool call refused");
            Err(ToolError::NotPermitted {
                role: self.role,
                capability,
            })
        }
    }

    pub fn read_file(&self, path: &str) -> Result<String, ToolError> {
        self.check(Capability::Read)?;
        self.inner.read_file(path)
    }

    pub fn write_file(&self, path: &str, content: &str) -> Result<(), ToolError> {
        self.check(Capability::Write)?;
        self.inner.write_file(path, content)
    }

    pub fn find_files(&self, pattern: &str) -> Result<Vec<String>, ToolError> {
        self.check(Capability::Find)?;
        self.inner.find_files(pattern)
    }

    pub fn search_pattern(&self, pattern: &str, path: &str) -> Result<Vec<String>, ToolError> {
        self.check(Capability::Search)?;
        self.inner.search_pattern(pattern, path)
    }

    pub fn run_command(&self, command: &str, timeout: Duration) -> Result<CommandOutput, ToolError> {
        self.check(Capability::Run)?;
        self.inner.run_command(command, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::MemoryTools;
    use std::sync::Arc;

    #[test]
    fn test_permission_table() {
        assert!(permissions_for(Role::Retriever).contains(&Capability::Search));
        assert!(permissions_for(Role::Editor).contains(&Capability::Write));
        assert!(!permissions_for(Role::Executor).contains(&Capability::Write));
        assert!(permissions_for(Role::Dispatcher).is_empty());
        assert!(permissions_for(Role::Reflector).is_empty());
    }

    #[test]
    fn test_scoped_tools_refuse_outside_permission_set() {
        let tools: SharedTools = Arc::new(MemoryTools::new().with_file("a.rs", "fn a() {}"));

        let verifier = ScopedTools::new(Role::Verifier, tools.clone());
        assert_eq!(verifier.read_file("a.rs").unwrap(), "fn a() {}");
        assert_eq!(
            verifier.write_file("a.rs", "x"),
            Err(ToolError::NotPermitted {
                role: Role::Verifier,
                capability: Capability::Write,
            })
        );

        let reflector = ScopedTools::new(Role::Reflector, tools);
        assert!(matches!(
            reflector.read_file("a.rs"),
            Err(ToolError::NotPermitted { .. })
        ));
    }
}
