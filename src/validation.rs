//! GLSL helper-function validation using the naga library.
//!
//! The emitted full shaders target the legacy dialect (attributes, varyings,
//! `gl_FragColor`), which naga's frontend does not accept. Shared helper
//! functions are plain GLSL though, so they are checked by wrapping them in a
//! modern-dialect module with a synthetic entry point.

use anyhow::{anyhow, Result};

/// Validate one helper function in isolation.
///
/// # Arguments
/// * `decl` - Full function definition, e.g. the shared sRGB decode helper
/// * `return_type` - GLSL type the function returns
/// * `call_expr` - Expression invoking the function with literal arguments
pub fn validate_helper_function(decl: &str, return_type: &str, call_expr: &str) -> Result<()> {
    // NOTE: The synthetic entrypoint exists purely to satisfy naga's GLSL
    // frontend; only the helper body is of interest.
    let source = format!(
        "#version 450\n\n{decl}\n\nlayout(location=0) out {return_type} _sf_out;\nvoid main() {{\n    _sf_out = {call_expr};\n}}\n"
    );

    let mut parser = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options {
        stage: naga::ShaderStage::Fragment,
        defines: Default::default(),
    };

    let module = parser
        .parse(&options, &source)
        .map_err(|e| anyhow!("GLSL parse failed: {e:?}\nGLSL:\n{source}"))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("GLSL validation failed: {e:?}\nGLSL:\n{source}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_decode_helper_is_valid_glsl() {
        // Validates the exact helper source the texture block registers.
        let decl = crate::graph::blocks::texture_blocks::TO_LINEAR_SPACE;
        validate_helper_function(decl, "vec4", "toLinearSpace(vec4(0.5, 0.5, 0.5, 1.0))")
            .unwrap();
    }

    #[test]
    fn syntax_errors_are_reported() {
        let decl = "vec4 broken(vec4 color) { return vec4(pow(color.rgb); }";
        assert!(validate_helper_function(decl, "vec4", "broken(vec4(0.0))").is_err());
    }

    #[test]
    fn type_errors_are_reported() {
        let decl = "vec4 wrong(vec4 color) { return color.rgb; }";
        assert!(validate_helper_function(decl, "vec4", "wrong(vec4(0.0))").is_err());
    }
}
