//! # Rule Evaluation Stage
//!
//! Looks up the destination country's business rules, hands them to the
//! rule engine together with the external parameters, and maps each
//! outcome to one result entry in evaluation order.
//!
//! No rules for the country is a pass-through, reported as a single
//! `OK / PASSED / IssuerInvalidation` entry.

use dcc_core::{
    AccessTokenConditions, CheckType, DccError, ResultCollector, ResultIdentifier, ResultType,
    ValidationResult,
};

use crate::decode::DecodedDcc;
use crate::provider::{RulesProvider, ValueSetProvider};
use crate::rules::{ExternalParameter, RuleEngine, RuleOutcome, RuleType, RuleVerdict};

/// The rule-stage collaborators.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    /// Rules by country.
    pub rules: &'a dyn RulesProvider,
    /// Value sets for the external parameters.
    pub value_sets: &'a dyn ValueSetProvider,
    /// The evaluator.
    pub engine: &'a dyn RuleEngine,
}

/// Evaluate the destination country's rules against the credential.
///
/// # Errors
///
/// Returns [`DccError::InvalidCondition`] if the validation clock does not
/// parse.
pub fn evaluate_rules(
    decoded: &DecodedDcc,
    conditions: &AccessTokenConditions,
    ctx: RuleContext<'_>,
    results: &mut ResultCollector,
) -> Result<(), DccError> {
    let country = conditions.coa.clone().unwrap_or_default();
    let rules = ctx.rules.rules_for_country(&country);
    if rules.is_empty() {
        tracing::debug!(%country, "no business rules for country");
        results.push(ValidationResult::passed(
            ResultIdentifier::IssuerInvalidation,
            "No rules for country of departure defined",
        ));
        return Ok(());
    }

    let credential = &decoded.credential;
    let params = ExternalParameter {
        validation_clock: conditions.validation_clock()?,
        value_sets: ctx.value_sets.value_sets(),
        country_code: country,
        exp: credential.expiration_time,
        iat: credential.issued_at,
        issuer_country_code: credential.issuing_country.clone(),
        kid: decoded.kid_base64(),
        region: conditions.roa.clone(),
    };

    let outcomes = ctx.engine.evaluate(
        credential.certificate_type(),
        &credential.certificate.schema_version,
        &rules,
        &params,
        &credential.hcert_json,
    );
    tracing::debug!(
        rules = rules.len(),
        outcomes = outcomes.len(),
        country = %params.country_code,
        "business rules evaluated"
    );

    for outcome in &outcomes {
        results.push(outcome_to_result(outcome));
    }
    Ok(())
}

/// Map one engine outcome to a result entry.
pub fn outcome_to_result(outcome: &RuleOutcome) -> ValidationResult {
    let (result, check_type) = match outcome.result {
        RuleVerdict::Open => (ResultType::Nok, CheckType::Open),
        RuleVerdict::Passed => (ResultType::Ok, CheckType::Passed),
        RuleVerdict::Fail => (ResultType::Nok, CheckType::Failed),
    };
    ValidationResult::new(
        result,
        check_type,
        identifier_for(outcome.rule.rule_type),
        outcome_details(outcome),
    )
}

fn identifier_for(rule_type: Option<RuleType>) -> ResultIdentifier {
    match rule_type {
        Some(RuleType::Acceptance) => ResultIdentifier::DestinationAcceptance,
        Some(RuleType::Invalidation) | Some(RuleType::Unrecognised) | None => {
            ResultIdentifier::IssuerInvalidation
        }
    }
}

fn outcome_details(outcome: &RuleOutcome) -> String {
    let mut details = format!(
        "{} {} ",
        outcome.rule.identifier,
        outcome.rule.english_description()
    );
    if let Some(current) = outcome.current.as_deref().filter(|c| !c.is_empty()) {
        details.push_str(current);
        details.push(' ');
    }
    if !outcome.validation_errors.is_empty() {
        details.push_str(" Exceptions: ");
        for message in &outcome.validation_errors {
            details.push_str(message);
            details.push(' ');
        }
    }
    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;
    use crate::testing::sample_rule;

    fn outcome(rule: Rule, result: RuleVerdict) -> RuleOutcome {
        RuleOutcome {
            rule,
            result,
            current: None,
            validation_errors: Vec::new(),
        }
    }

    #[test]
    fn verdicts_map_to_result_and_type() {
        let rule = sample_rule("GR-DE-0001", "DE", Some(RuleType::Acceptance));
        let cases = [
            (RuleVerdict::Open, ResultType::Nok, CheckType::Open),
            (RuleVerdict::Passed, ResultType::Ok, CheckType::Passed),
            (RuleVerdict::Fail, ResultType::Nok, CheckType::Failed),
        ];
        for (verdict, result, check_type) in cases {
            let r = outcome_to_result(&outcome(rule.clone(), verdict));
            assert_eq!(r.result, result);
            assert_eq!(r.check_type, check_type);
        }
    }

    #[test]
    fn rule_kind_selects_identifier() {
        let cases = [
            (Some(RuleType::Acceptance), ResultIdentifier::DestinationAcceptance),
            (Some(RuleType::Invalidation), ResultIdentifier::IssuerInvalidation),
            (Some(RuleType::Unrecognised), ResultIdentifier::IssuerInvalidation),
            (None, ResultIdentifier::IssuerInvalidation),
        ];
        for (kind, identifier) in cases {
            let rule = sample_rule("GR-DE-0001", "DE", kind);
            let r = outcome_to_result(&outcome(rule, RuleVerdict::Passed));
            assert_eq!(r.identifier, identifier);
        }
    }

    #[test]
    fn details_without_current_or_errors() {
        let rule = sample_rule("GR-DE-0001", "DE", Some(RuleType::Acceptance));
        let r = outcome_to_result(&outcome(rule, RuleVerdict::Passed));
        assert_eq!(r.details, "GR-DE-0001 Sample rule GR-DE-0001 ");
    }

    #[test]
    fn details_with_current_and_errors() {
        let rule = sample_rule("VR-DE-0002", "DE", Some(RuleType::Invalidation));
        let o = RuleOutcome {
            rule,
            result: RuleVerdict::Fail,
            current: Some("dn=1".to_string()),
            validation_errors: vec!["missing var".to_string(), "bad date".to_string()],
        };
        assert_eq!(
            outcome_to_result(&o).details,
            "VR-DE-0002 Sample rule VR-DE-0002 dn=1  Exceptions: missing var bad date "
        );
    }

    #[test]
    fn empty_current_is_omitted() {
        let rule = sample_rule("VR-DE-0003", "DE", None);
        let mut o = outcome(rule, RuleVerdict::Open);
        o.current = Some(String::new());
        assert_eq!(outcome_to_result(&o).details, "VR-DE-0003 Sample rule VR-DE-0003 ");
    }
}
