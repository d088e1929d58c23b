use nuq_core::errors::{ErrorInfo, NuqError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("node", "3")
        .with_context("channel", "neutrino")
}

#[test]
fn config_error_surface() {
    let err = NuqError::Config(sample_info("missing-body", "body not set"));
    assert_eq!(err.info().code, "missing-body");
    assert!(err.info().context.contains_key("node"));
}

#[test]
fn argument_error_surface() {
    let err = NuqError::Argument(sample_info("bad-flavor", "flavor index out of range"));
    assert_eq!(err.info().code, "bad-flavor");
    assert!(err.info().context.contains_key("channel"));
}

#[test]
fn algebra_error_surface() {
    let err = NuqError::Algebra(sample_info("dim-mismatch", "operand dimensions differ"));
    assert_eq!(err.info().code, "dim-mismatch");
}

#[test]
fn ode_error_surface() {
    let err = NuqError::Ode(sample_info("step-underflow", "step size below minimum"));
    assert_eq!(err.info().code, "step-underflow");
}

#[test]
fn serde_error_surface() {
    let err = NuqError::Serde(sample_info("version", "snapshot written by newer version"));
    assert_eq!(err.info().code, "version");
}

#[test]
fn display_includes_hint() {
    let err = NuqError::Config(
        ErrorInfo::new("missing-energy", "energy grid not configured")
            .with_hint("call one of the grid constructors first"),
    );
    let text = err.to_string();
    assert!(text.contains("missing-energy"));
    assert!(text.contains("call one of the grid constructors first"));
}
