use shadeforge::graph::blocks::{
    input_blocks, logic_blocks, math_blocks, output_blocks, texture_blocks, vector_blocks,
    ConditionalOp, MathOp,
};
use shadeforge::{compile, DrawState, Graph, NodeValueType};

/// A material exercising most of the block catalog: transformed position in
/// the vertex stage, a texture modulated by vector math in the fragment stage.
fn textured_material() -> Graph {
    let mut g = Graph::new();

    let position = g
        .add(input_blocks::attribute("position", NodeValueType::Vector3))
        .unwrap();
    let uv = g
        .add(input_blocks::attribute("uv", NodeValueType::Vector2))
        .unwrap();
    let wvp = g
        .add(input_blocks::system_uniform(
            "worldViewProjection",
            input_blocks::SystemValue::WorldViewProjection,
        ))
        .unwrap();

    let projected = g.add(vector_blocks::transform("projected")).unwrap();
    let vout = g.add(output_blocks::vertex_output("vertexOutput")).unwrap();

    let albedo = g.add(texture_blocks::texture("albedo")).unwrap();
    let tint = g
        .add(input_blocks::color3_constant("tint", [1.0, 0.5, 0.25]))
        .unwrap();
    let blend = g
        .add(input_blocks::constant(
            "blendFactor",
            input_blocks::ConstantValue::Float(0.3),
        ))
        .unwrap();
    let mixed = g.add(math_blocks::math("mixed", MathOp::Lerp)).unwrap();
    let fout = g
        .add(output_blocks::fragment_output("fragmentOutput"))
        .unwrap();

    g.connect(position, "output", projected, "vector").unwrap();
    g.connect(wvp, "output", projected, "transform").unwrap();
    g.connect(projected, "output", vout, "vector").unwrap();

    g.connect(uv, "output", albedo, "uv").unwrap();
    g.connect(albedo, "rgb", mixed, "left").unwrap();
    g.connect(tint, "output", mixed, "right").unwrap();
    g.connect(blend, "output", mixed, "gradient").unwrap();
    g.connect(mixed, "output", fout, "rgba").unwrap();
    g
}

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn textured_material_emits_expected_declarations() {
    init_logs();
    let material = compile(&textured_material()).unwrap();
    let vs = &material.vertex_source;
    let fs = &material.fragment_source;

    assert!(vs.starts_with("precision highp float;\n"));
    assert!(fs.starts_with("precision highp float;\n"));

    assert!(vs.contains("attribute vec3 position;"));
    assert!(vs.contains("attribute vec2 uv;"));
    assert!(vs.contains("uniform mat4 worldViewProjection;"));
    assert!(vs.contains("vec4 projected = worldViewProjection * vec4(position, 1.0);"));
    assert!(vs.contains("gl_Position = projected;"));

    // The uv attribute is consumed in the fragment stage, so both programs
    // carry the varying and the vertex main feeds it as its last statement.
    assert!(vs.contains("varying vec2 v_uv;"));
    assert!(fs.contains("varying vec2 v_uv;"));
    let feed = vs.find("v_uv = uv;").expect("varying transfer missing");
    assert!(feed > vs.find("gl_Position").unwrap());

    assert!(fs.contains("uniform sampler2D albedoSampler;"));
    assert!(fs.contains("vec4 albedo = texture2D(albedoSampler, v_uv);"));
    assert!(fs.contains("#ifdef ALBEDO_GAMMA"));
    assert!(fs.contains("albedo = toLinearSpace(albedo);"));
    assert!(fs.contains("vec4 toLinearSpace(vec4 color)"));
    assert!(fs.contains("vec3 albedoRgb = albedo.rgb;"));
    assert!(fs.contains("const vec3 tint = vec3(1.0, 0.5, 0.25);"));
    assert!(fs.contains("const float blendFactor = 0.3;"));
    assert!(fs.contains("vec3 mixed = mix(albedoRgb, tint, blendFactor);"));
    assert!(fs.contains("gl_FragColor = vec4(mixed, 1.0);"));

    // Declarations precede main in both stages.
    for source in [vs, fs] {
        let main = source.find("void main(void)").unwrap();
        for decl in ["attribute ", "uniform ", "varying ", "const "] {
            if let Some(idx) = source.find(decl) {
                assert!(idx < main, "{decl} declared after main");
            }
        }
    }
}

#[test]
fn vector_and_logic_blocks_compile_into_one_chain() {
    let mut g = Graph::new();
    let position = g
        .add(input_blocks::attribute("position", NodeValueType::Vector4))
        .unwrap();
    let vout = g.add(output_blocks::vertex_output("vertexOutput")).unwrap();
    g.connect(position, "output", vout, "vector").unwrap();

    let a = g
        .add(input_blocks::constant(
            "axisA",
            input_blocks::ConstantValue::Vector3([1.0, 0.0, 0.0]),
        ))
        .unwrap();
    let b = g
        .add(input_blocks::constant(
            "axisB",
            input_blocks::ConstantValue::Vector3([0.0, 1.0, 0.0]),
        ))
        .unwrap();
    let threshold = g
        .add(input_blocks::constant(
            "threshold",
            input_blocks::ConstantValue::Float(0.5),
        ))
        .unwrap();
    let tint = g
        .add(input_blocks::color3_constant("tint", [0.2, 0.4, 0.8]))
        .unwrap();
    let strength = g
        .add(input_blocks::constant(
            "strength",
            input_blocks::ConstantValue::Float(2.0),
        ))
        .unwrap();

    let crossed = g.add(vector_blocks::cross("crossed")).unwrap();
    let unit = g.add(vector_blocks::normalize("unit")).unwrap();
    let alignment = g.add(vector_blocks::dot("alignment")).unwrap();
    let pick = g
        .add(logic_blocks::conditional("pick", ConditionalOp::LessThan))
        .unwrap();
    let scaled = g.add(math_blocks::math("scaled", MathOp::Scale)).unwrap();
    let fout = g
        .add(output_blocks::fragment_output("fragmentOutput"))
        .unwrap();

    g.connect(a, "output", crossed, "left").unwrap();
    g.connect(b, "output", crossed, "right").unwrap();
    g.connect(crossed, "output", unit, "input").unwrap();
    g.connect(unit, "output", alignment, "left").unwrap();
    g.connect(a, "output", alignment, "right").unwrap();
    g.connect(alignment, "output", pick, "a").unwrap();
    g.connect(threshold, "output", pick, "b").unwrap();
    g.connect(tint, "output", pick, "true").unwrap();
    g.connect(pick, "output", scaled, "input").unwrap();
    g.connect(strength, "output", scaled, "factor").unwrap();
    g.connect(scaled, "output", fout, "rgba").unwrap();

    let material = compile(&g).unwrap();
    let fs = &material.fragment_source;

    assert!(fs.contains("vec3 crossed = cross(axisA, axisB);"));
    assert!(fs.contains("vec3 unit = normalize(crossed);"));
    assert!(fs.contains("float alignment = dot(unit, axisA);"));
    // Unwired false branch falls back to a typed zero.
    assert!(fs.contains("vec3 pick = (alignment < threshold) ? tint : vec3(0.0);"));
    assert!(fs.contains("vec3 scaled = pick * strength;"));
    assert!(fs.contains("gl_FragColor = vec4(scaled, 1.0);"));

    // Statement order follows dependency order.
    let order = ["crossed =", "unit =", "alignment =", "pick =", "scaled =", "gl_FragColor"];
    let mut last = 0;
    for needle in order {
        let at = fs.find(needle).unwrap_or_else(|| panic!("missing {needle}"));
        assert!(at > last, "{needle} emitted out of order");
        last = at;
    }

    // axisA feeds both the cross and the dot; its declaration must not repeat.
    assert_eq!(fs.matches("const vec3 axisA").count(), 1);
}

#[test]
fn blocks_shared_by_two_paths_emit_once() {
    // Diamond: one normalized vector fans out into two scales that are summed
    // back together. Every block on the shared path emits exactly one
    // statement.
    let mut g = Graph::new();
    let position = g
        .add(input_blocks::attribute("position", NodeValueType::Vector4))
        .unwrap();
    let vout = g.add(output_blocks::vertex_output("vertexOutput")).unwrap();
    g.connect(position, "output", vout, "vector").unwrap();

    let dir = g
        .add(input_blocks::constant(
            "dir",
            input_blocks::ConstantValue::Vector3([0.0, 3.0, 4.0]),
        ))
        .unwrap();
    let gain_a = g
        .add(input_blocks::constant(
            "gainA",
            input_blocks::ConstantValue::Float(0.25),
        ))
        .unwrap();
    let gain_b = g
        .add(input_blocks::constant(
            "gainB",
            input_blocks::ConstantValue::Float(0.75),
        ))
        .unwrap();
    let unit = g.add(vector_blocks::normalize("unit")).unwrap();
    let scaled_a = g.add(math_blocks::math("scaledA", MathOp::Scale)).unwrap();
    let scaled_b = g.add(math_blocks::math("scaledB", MathOp::Scale)).unwrap();
    let sum = g.add(math_blocks::math("sum", MathOp::Add)).unwrap();
    let fout = g
        .add(output_blocks::fragment_output("fragmentOutput"))
        .unwrap();

    g.connect(dir, "output", unit, "input").unwrap();
    g.connect(unit, "output", scaled_a, "input").unwrap();
    g.connect(gain_a, "output", scaled_a, "factor").unwrap();
    g.connect(unit, "output", scaled_b, "input").unwrap();
    g.connect(gain_b, "output", scaled_b, "factor").unwrap();
    g.connect(scaled_a, "output", sum, "left").unwrap();
    g.connect(scaled_b, "output", sum, "right").unwrap();
    g.connect(sum, "output", fout, "rgba").unwrap();

    let material = compile(&g).unwrap();
    let fs = &material.fragment_source;

    assert_eq!(fs.matches("const vec3 dir").count(), 1);
    assert_eq!(fs.matches("vec3 unit = normalize(dir);").count(), 1);
    assert_eq!(fs.matches("vec3 scaledA = unit * gainA;").count(), 1);
    assert_eq!(fs.matches("vec3 scaledB = unit * gainB;").count(), 1);
    assert_eq!(fs.matches("vec3 sum = scaledA + scaledB;").count(), 1);
}

#[test]
fn multiple_fragment_roots_all_compile() {
    let mut g = Graph::new();
    let position = g
        .add(input_blocks::attribute("position", NodeValueType::Vector4))
        .unwrap();
    let vout = g.add(output_blocks::vertex_output("vertexOutput")).unwrap();
    g.connect(position, "output", vout, "vector").unwrap();

    let base = g
        .add(input_blocks::color3_constant("base", [0.1, 0.2, 0.3]))
        .unwrap();
    let overlay = g
        .add(input_blocks::color3_constant("overlay", [0.9, 0.8, 0.7]))
        .unwrap();
    let first = g.add(output_blocks::fragment_output("baseColor")).unwrap();
    let second = g
        .add(output_blocks::fragment_output("overlayColor"))
        .unwrap();
    g.connect(base, "output", first, "rgba").unwrap();
    g.connect(overlay, "output", second, "rgba").unwrap();

    let material = compile(&g).unwrap();
    let fs = &material.fragment_source;
    let first_write = fs.find("gl_FragColor = vec4(base, 1.0);").unwrap();
    let second_write = fs.find("gl_FragColor = vec4(overlay, 1.0);").unwrap();
    // Roots are walked in insertion order.
    assert!(first_write < second_write);
}

#[test]
fn compilation_is_deterministic() {
    let graph = textured_material();
    let first = compile(&graph).unwrap();
    let second = compile(&graph).unwrap();
    assert_eq!(first.vertex_source, second.vertex_source);
    assert_eq!(first.fragment_source, second.fragment_source);
}

#[test]
fn json_round_trip_compiles_to_identical_sources() {
    let original = textured_material();
    let json = original.to_json().unwrap();
    let restored = Graph::from_json(&json).unwrap();

    let a = compile(&original).unwrap();
    let b = compile(&restored).unwrap();
    assert_eq!(a.vertex_source, b.vertex_source);
    assert_eq!(a.fragment_source, b.fragment_source);
}

#[test]
fn draw_metadata_covers_uniforms_and_textures() {
    let graph = textured_material();
    let material = compile(&graph).unwrap();

    let bound: Vec<&str> = material
        .bindable_blocks
        .iter()
        .map(|b| b.variable.as_str())
        .collect();
    assert!(bound.contains(&"worldViewProjection"));
    assert!(bound.contains(&"albedoSampler"));

    assert_eq!(material.texture_blocks.len(), 1);
    assert_eq!(material.blocks_with_defines.len(), 1);

    let mut draw = DrawState::default();
    assert!(material.prepare_defines(&draw).is_empty());
    draw.gamma_textures.insert(material.texture_blocks[0]);
    assert_eq!(
        material.prepare_defines(&draw),
        vec!["#define ALBEDO_GAMMA"]
    );
}

#[test]
fn unconsumed_texture_rgb_output_costs_nothing() {
    let mut g = Graph::new();
    let position = g
        .add(input_blocks::attribute("position", NodeValueType::Vector4))
        .unwrap();
    let vout = g.add(output_blocks::vertex_output("vertexOutput")).unwrap();
    g.connect(position, "output", vout, "vector").unwrap();

    let uv = g
        .add(input_blocks::attribute("uv", NodeValueType::Vector2))
        .unwrap();
    let albedo = g.add(texture_blocks::texture("albedo")).unwrap();
    let fout = g
        .add(output_blocks::fragment_output("fragmentOutput"))
        .unwrap();
    g.connect(uv, "output", albedo, "uv").unwrap();
    g.connect(albedo, "rgba", fout, "rgba").unwrap();

    let material = compile(&g).unwrap();
    assert!(!material.fragment_source.contains(".rgb;"));
    assert!(material.fragment_source.contains("gl_FragColor = albedo;"));
}
