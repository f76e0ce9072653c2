//! Fuzz target for import policy documents.
//!
//! Arbitrary JSON policies evaluated against an arbitrary passport must
//! never panic, and every reported field must come from a strip rule.

#![no_main]

use libfuzzer_sys::fuzz_target;

use interconnect_policy::{ImportPolicy, ImportPolicyEngine, PolicyDecision};

fuzz_target!(|data: &[u8]| {
    let Some(split) = data.iter().position(|&b| b == 0) else {
        return;
    };
    let (policy, passport) = (&data[..split], &data[split + 1..]);

    let Ok(policy) = serde_json::from_slice::<ImportPolicy>(policy) else {
        return;
    };
    let Ok(mut value) = serde_json::from_slice::<serde_json::Value>(passport) else {
        return;
    };

    let decision = ImportPolicyEngine::new().evaluate(&policy, &mut value);
    if let PolicyDecision::AdmitStripped(fields) = decision {
        let declared: Vec<String> = policy.strip_rules().map(|p| p.to_string()).collect();
        for field in &fields {
            assert!(declared.contains(field), "reported {field} without a strip rule");
        }
    }
});
