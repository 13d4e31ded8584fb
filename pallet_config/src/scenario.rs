//! Scripted simulation runs.
//!
//! ```toml
//! duration_ms = 20000
//!
//! [[step]]
//! at_ms = 0
//! load = 1.95
//!
//! [[step]]
//! at_ms = 4000
//! tag = "AA:BB:CC"
//! ```
//!
//! Each step applies at `at_ms` (simulation time): `load` sets the weight on
//! the pallet, `tag` presents a tag to the reader once, `ready = false`
//! makes the load-cell converter stop reporting data until set back.
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScenarioStep {
    pub at_ms: u64,
    #[serde(default)]
    pub load: Option<f32>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Scenario {
    /// Simulated run length; defaults to the last step plus five seconds.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default, rename = "step")]
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms.unwrap_or_else(|| {
            self.steps
                .last()
                .map_or(0, |s| s.at_ms)
                .saturating_add(5_000)
        })
    }

    pub fn validate(&self) -> eyre::Result<()> {
        let mut last = 0u64;
        for (idx, step) in self.steps.iter().enumerate() {
            if step.at_ms < last {
                eyre::bail!("step[{idx}].at_ms goes backwards ({} < {last})", step.at_ms);
            }
            last = step.at_ms;
            if let Some(load) = step.load
                && !load.is_finite()
            {
                eyre::bail!("step[{idx}].load must be finite");
            }
            if step.load.is_none() && step.tag.is_none() && step.ready.is_none() {
                eyre::bail!("step[{idx}] does nothing (set load, tag or ready)");
            }
        }
        if let Some(d) = self.duration_ms
            && d < last
        {
            eyre::bail!("duration_ms ends before the last step");
        }
        Ok(())
    }
}

pub fn load_scenario(s: &str) -> eyre::Result<Scenario> {
    let scenario: Scenario =
        toml::from_str(s).map_err(|e| eyre::eyre!("invalid scenario: {e}"))?;
    scenario.validate()?;
    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_steps_in_order() {
        let sc = load_scenario(
            r#"
[[step]]
at_ms = 0
load = 1.95

[[step]]
at_ms = 4000
tag = "AABBCC"
"#,
        )
        .expect("valid scenario");
        assert_eq!(sc.steps.len(), 2);
        assert_eq!(sc.duration_ms(), 9_000);
        assert_eq!(sc.steps[1].tag.as_deref(), Some("AABBCC"));
    }

    #[test]
    fn rejects_backwards_time() {
        let err = load_scenario("[[step]]\nat_ms = 10\nload = 1.0\n[[step]]\nat_ms = 5\nload = 0.0\n")
            .expect_err("backwards");
        assert!(err.to_string().contains("backwards"));
    }
}
