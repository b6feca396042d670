//! List command handler

use portero::{Scenario, ScenarioKind};

use crate::commands::ListArgs;
use crate::config;
use crate::error::CliResult;

const fn kind_label(kind: ScenarioKind) -> &'static str {
    match kind {
        ScenarioKind::Positive => "positive",
        ScenarioKind::Negative => "negative",
    }
}

/// One line per scenario, optionally followed by its steps
#[must_use]
pub fn render_list(scenarios: &[Scenario], steps: bool) -> String {
    let mut out = String::new();
    for scenario in scenarios {
        out.push_str(&format!(
            "{:<8} {:<9} {}",
            scenario.id,
            kind_label(scenario.kind),
            scenario.title
        ));
        if !scenario.tags.is_empty() {
            out.push_str(&format!(" [{}]", scenario.tags.join(", ")));
        }
        out.push('\n');
        if steps {
            out.push_str(&format!("           credential: {}\n", scenario.credential.label()));
            for (i, step) in scenario.steps.iter().enumerate() {
                out.push_str(&format!("           {:>2}. {}\n", i + 1, step.describe()));
            }
        }
    }
    out.push_str(&format!("{} scenario(s)\n", scenarios.len()));
    out
}

/// Execute the list command
pub fn execute_list(args: &ListArgs) -> CliResult<()> {
    let config = config::suite_config(&args.suite)?;
    let scenarios = config::scenarios(&args.suite, &config)?;
    print!("{}", render_list(&scenarios, args.steps));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use portero::catalog;
    use portero::Messages;

    #[test]
    fn test_render_list() {
        let suite = catalog::sign_in_suite(&Messages::default());
        let out = render_list(&suite, false);
        assert!(out.contains("TC-001"));
        assert!(out.contains("TC-012"));
        assert!(out.contains("[smoke]"));
        assert!(out.ends_with("12 scenario(s)\n"));
        assert!(!out.contains("credential:"));
    }

    #[test]
    fn test_render_steps() {
        let suite = catalog::filter(
            catalog::sign_in_suite(&Messages::default()),
            Some("TC-001"),
        );
        let out = render_list(&suite, true);
        assert!(out.contains("credential: fixture:valid-user"));
        assert!(out.contains(" 1. "));
    }
}
