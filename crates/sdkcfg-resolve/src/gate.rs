//! Feature gating: decides which registry modules are active for one run.
//!
//! Gates are evaluated dependency-first. Modules are walked in registry
//! order and each module's co-requisites are visited before the module
//! itself, so a co-requisite check always sees the final state of the
//! modules it names. The same walk detects cycles.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use sdkcfg_catalog::{ModuleDescriptor, VariantKey};
use sdkcfg_device::{CompiledRule, DeviceContext};
use serde::Serialize;

use crate::error::{ConfigError, Result};

/// A registry module prepared for one run: support rule compiled and, when
/// the device matched, its variant merged in.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub descriptor: ModuleDescriptor,
    pub variant: Option<VariantKey>,
    pub rule: CompiledRule,
}

impl Candidate {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Whether the run's device is in the module's support rule.
    pub fn supports_device(&self, ctx: &DeviceContext) -> bool {
        self.rule.matches(&ctx.device_id)
    }
}

/// Why a module stayed inactive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "reason", content = "module")]
pub enum Inactive {
    /// Device not in the support rule.
    Device,
    /// RTOS not in the module's allow-list.
    Rtos,
    /// Opt-in module the user has not added.
    NotEnabled,
    /// A co-requisite is not active.
    MissingRequirement(String),
}

impl fmt::Display for Inactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inactive::Device => f.write_str("device not supported"),
            Inactive::Rtos => f.write_str("RTOS not supported"),
            Inactive::NotEnabled => f.write_str("not added to the configuration"),
            Inactive::MissingRequirement(m) => write!(f, "requires {m}"),
        }
    }
}

/// Gate outcome for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateDecision {
    Active,
    Inactive(Inactive),
}

impl GateDecision {
    pub fn is_active(&self) -> bool {
        matches!(self, GateDecision::Active)
    }
}

/// A module name with its gate outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleGate {
    pub module: String,
    pub decision: GateDecision,
}

/// Result of gating every candidate in one run.
#[derive(Debug, Clone, Default)]
pub struct Activation {
    /// Candidate indices of active modules, in activation order.
    pub active: Vec<usize>,
    /// Every module's decision, in evaluation order.
    pub decisions: Vec<ModuleGate>,
}

/// Single-module gate: the device matches `rule` and every co-requisite
/// is in `cooperating`.
pub fn gate(
    ctx: &DeviceContext,
    rule: &CompiledRule,
    requires: &[String],
    cooperating: &BTreeSet<String>,
) -> bool {
    rule.matches(&ctx.device_id) && requires.iter().all(|r| cooperating.contains(r))
}

/// Dependency-first evaluation order over `candidates`.
///
/// Only co-requisites naming other candidates form edges. Fails with
/// [`ConfigError::CyclicFeatureDependency`] carrying the cycle path.
pub fn evaluation_order(candidates: &[Candidate]) -> Result<Vec<usize>> {
    let index: HashMap<&str, usize> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name(), i))
        .collect();

    let mut walk = Walk {
        candidates,
        index: &index,
        visited: vec![false; candidates.len()],
        path: Vec::new(),
        order: Vec::with_capacity(candidates.len()),
    };
    for i in 0..candidates.len() {
        walk.visit(i)?;
    }
    Ok(walk.order)
}

struct Walk<'a> {
    candidates: &'a [Candidate],
    index: &'a HashMap<&'a str, usize>,
    visited: Vec<bool>,
    path: Vec<usize>,
    order: Vec<usize>,
}

impl Walk<'_> {
    fn visit(&mut self, node: usize) -> Result<()> {
        if let Some(pos) = self.path.iter().position(|&n| n == node) {
            let mut cycle: Vec<String> = self.path[pos..]
                .iter()
                .map(|&n| self.candidates[n].name().to_string())
                .collect();
            cycle.push(self.candidates[node].name().to_string());
            return Err(ConfigError::CyclicFeatureDependency { cycle });
        }
        if self.visited[node] {
            return Ok(());
        }

        self.path.push(node);
        let (candidates, index) = (self.candidates, self.index);
        for dep in &candidates[node].descriptor.requires {
            if let Some(&next) = index.get(dep.as_str()) {
                self.visit(next)?;
            }
        }
        self.path.pop();

        self.visited[node] = true;
        self.order.push(node);
        Ok(())
    }
}

/// Gate every candidate for `ctx`.
pub fn evaluate(ctx: &DeviceContext, candidates: &[Candidate]) -> Result<Activation> {
    let order = evaluation_order(candidates)?;

    // Co-requisites outside the registry are satisfied by the enabled set;
    // registry modules join only once they are decided active.
    let mut cooperating: BTreeSet<String> = ctx
        .enabled_modules
        .iter()
        .filter(|m| !candidates.iter().any(|c| c.name() == m.as_str()))
        .cloned()
        .collect();

    let mut activation = Activation::default();
    for i in order {
        let candidate = &candidates[i];
        let decision = decide(ctx, candidate, &cooperating);
        match &decision {
            GateDecision::Active => {
                tracing::debug!(module = candidate.name(), "active");
                cooperating.insert(candidate.name().to_string());
                activation.active.push(i);
            }
            GateDecision::Inactive(Inactive::MissingRequirement(missing)) => {
                tracing::warn!(
                    module = candidate.name(),
                    requires = missing.as_str(),
                    "skipping module: co-requisite is not active"
                );
            }
            GateDecision::Inactive(reason) => {
                tracing::debug!(module = candidate.name(), %reason, "inactive");
            }
        }
        activation.decisions.push(ModuleGate {
            module: candidate.name().to_string(),
            decision,
        });
    }
    Ok(activation)
}

fn decide(ctx: &DeviceContext, candidate: &Candidate, cooperating: &BTreeSet<String>) -> GateDecision {
    let d = &candidate.descriptor;
    if !candidate.supports_device(ctx) {
        return GateDecision::Inactive(Inactive::Device);
    }
    if !d.supports_rtos(ctx.rtos) {
        return GateDecision::Inactive(Inactive::Rtos);
    }
    if d.opt_in && !ctx.has_module(&d.name) {
        return GateDecision::Inactive(Inactive::NotEnabled);
    }
    if gate(ctx, &candidate.rule, &d.requires, cooperating) {
        return GateDecision::Active;
    }
    let missing = d
        .requires
        .iter()
        .find(|r| !cooperating.contains(*r))
        .cloned()
        .unwrap_or_default();
    GateDecision::Inactive(Inactive::MissingRequirement(missing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdkcfg_device::{DeviceDatabase, RtosKind, SupportRule};

    fn ctx(device: &str, rtos: RtosKind, enabled: &[&str]) -> DeviceContext {
        DeviceContext::from_source(&DeviceDatabase::builtin(), device, rtos, enabled.iter().copied())
            .unwrap()
    }

    fn candidate(name: &str, support: SupportRule, requires: &[&str]) -> Candidate {
        let mut descriptor = ModuleDescriptor::new(name, support);
        descriptor.requires = requires.iter().map(|r| r.to_string()).collect();
        let rule = descriptor.support.compile().unwrap();
        Candidate {
            descriptor,
            variant: None,
            rule,
        }
    }

    fn active_names(candidates: &[Candidate], activation: &Activation) -> Vec<String> {
        activation
            .active
            .iter()
            .map(|&i| candidates[i].name().to_string())
            .collect()
    }

    #[test]
    fn gate_checks_device_and_cooperating() {
        let c = ctx("CC2674P10RGZ", RtosKind::FreeRtos, &[]);
        let rule = SupportRule::patterns(["CC26.4"]).compile().unwrap();
        let coop = BTreeSet::from(["/ti/tfm/TrustZone".to_string()]);
        let requires = vec!["/ti/tfm/TrustZone".to_string()];
        assert!(gate(&c, &rule, &requires, &coop));
        assert!(!gate(&c, &rule, &requires, &BTreeSet::new()));
        let other = SupportRule::patterns(["CC23.0"]).compile().unwrap();
        assert!(!gate(&c, &other, &[], &coop));
    }

    #[test]
    fn dependencies_evaluated_first_regardless_of_registry_order() {
        // Dependent listed before its co-requisite.
        let candidates = vec![
            candidate("/ti/tfm/SecureCB", SupportRule::Unconditional, &["/ti/tfm/TrustZone"]),
            candidate("/ti/drivers/DMA", SupportRule::Unconditional, &[]),
            candidate("/ti/tfm/TrustZone", SupportRule::Unconditional, &[]),
        ];
        let order = evaluation_order(&candidates).unwrap();
        assert_eq!(order, vec![2, 0, 1]);

        let activation = evaluate(&ctx("CC1352P7RGZ", RtosKind::NoRtos, &[]), &candidates).unwrap();
        assert_eq!(
            active_names(&candidates, &activation),
            vec!["/ti/tfm/TrustZone", "/ti/tfm/SecureCB", "/ti/drivers/DMA"]
        );
    }

    #[test]
    fn monotonic_under_registry_permutation() {
        let a = candidate("/a", SupportRule::Unconditional, &[]);
        let b = candidate("/b", SupportRule::Unconditional, &["/a"]);
        let c = candidate("/c", SupportRule::none(), &[]);
        let d = candidate("/d", SupportRule::Unconditional, &["/c"]);
        let context = ctx("CC1352P7RGZ", RtosKind::NoRtos, &[]);

        let forward = vec![a.clone(), b.clone(), c.clone(), d.clone()];
        let reverse = vec![d, c, b, a];
        for candidates in [forward, reverse] {
            let activation = evaluate(&context, &candidates).unwrap();
            let mut active = active_names(&candidates, &activation);
            active.sort();
            assert_eq!(active, vec!["/a", "/b"]);
        }
    }

    #[test]
    fn cycle_reports_path() {
        let candidates = vec![
            candidate("/a", SupportRule::Unconditional, &["/b"]),
            candidate("/b", SupportRule::Unconditional, &["/c"]),
            candidate("/c", SupportRule::Unconditional, &["/a"]),
        ];
        match evaluation_order(&candidates) {
            Err(ConfigError::CyclicFeatureDependency { cycle }) => {
                assert_eq!(cycle, vec!["/a", "/b", "/c", "/a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn external_requirement_uses_enabled_set() {
        let candidates = vec![candidate(
            "/ti/ble5stack/ble",
            SupportRule::Unconditional,
            &["/ti/dmm/dmm"],
        )];
        let off = evaluate(&ctx("CC2652R7RGZ", RtosKind::FreeRtos, &[]), &candidates).unwrap();
        assert!(off.active.is_empty());
        assert_eq!(
            off.decisions[0].decision,
            GateDecision::Inactive(Inactive::MissingRequirement("/ti/dmm/dmm".into()))
        );

        let on = evaluate(
            &ctx("CC2652R7RGZ", RtosKind::FreeRtos, &["/ti/dmm/dmm"]),
            &candidates,
        )
        .unwrap();
        assert_eq!(on.active, vec![0]);
    }

    #[test]
    fn enabling_an_inactive_registry_module_is_not_enough() {
        // Named in the enabled set but unsupported on this device.
        let candidates = vec![
            candidate("/ti/tfm/TrustZone", SupportRule::patterns(["CC26.4"]), &[]),
            candidate("/ti/tfm/SecureCB", SupportRule::Unconditional, &["/ti/tfm/TrustZone"]),
        ];
        let activation = evaluate(
            &ctx("CC1352P7RGZ", RtosKind::FreeRtos, &["/ti/tfm/TrustZone"]),
            &candidates,
        )
        .unwrap();
        assert!(activation.active.is_empty());
    }

    #[test]
    fn rtos_and_opt_in_gates() {
        let mut posix = candidate("/ti/posix/freertos", SupportRule::Unconditional, &[]);
        posix.descriptor.rtos = vec![RtosKind::FreeRtos];
        let mut boot = candidate("/ti/common/mcuboot", SupportRule::Unconditional, &[]);
        boot.descriptor.opt_in = true;
        let candidates = vec![posix, boot];

        let bare = evaluate(&ctx("CC2340R5RKP", RtosKind::NoRtos, &[]), &candidates).unwrap();
        assert_eq!(bare.decisions[0].decision, GateDecision::Inactive(Inactive::Rtos));
        assert_eq!(bare.decisions[1].decision, GateDecision::Inactive(Inactive::NotEnabled));

        let full = evaluate(
            &ctx("CC2340R5RKP", RtosKind::FreeRtos, &["/ti/common/mcuboot"]),
            &candidates,
        )
        .unwrap();
        assert_eq!(full.active, vec![0, 1]);
    }

    #[test]
    fn empty_device_list_never_active() {
        let candidates = vec![candidate("/ti/bleapp/ble_app_util", SupportRule::none(), &[])];
        for device in ["CC1352P7RGZ", "CC2674P10RGZ", "CC2340R5RKP", "CC2745R10RHA"] {
            let activation = evaluate(&ctx(device, RtosKind::FreeRtos, &[]), &candidates).unwrap();
            assert!(activation.active.is_empty());
            assert_eq!(
                activation.decisions[0].decision,
                GateDecision::Inactive(Inactive::Device)
            );
        }
    }
}
