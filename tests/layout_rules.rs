// Standardized layout rules checked against hand-computed block layouts

use gpu_mirror::layout::{calculate_layout, FieldSpec, FieldType, PackingMode, ScalarKind};
use proptest::prelude::*;

fn offsets(specs: &[FieldSpec], packing: PackingMode) -> Vec<(u64, u64)> {
    calculate_layout(specs, packing)
        .unwrap()
        .fields
        .iter()
        .map(|f| (f.offset, f.stride))
        .collect()
}

#[test]
fn test_lighting_block_std140() {
    // struct Lights { vec3 ambient; float intensity; vec4 colors[4]; vec3 dirs[4]; mat4 view; int count; }
    let specs = [
        FieldSpec::new("ambient", FieldType::VEC3, 1),
        FieldSpec::new("intensity", FieldType::FLOAT, 1),
        FieldSpec::new("colors", FieldType::VEC4, 4),
        FieldSpec::new("dirs", FieldType::VEC3, 4),
        FieldSpec::new("view", FieldType::MAT4, 1),
        FieldSpec::new("count", FieldType::INT, 1),
    ];
    let layout = calculate_layout(&specs, PackingMode::Std140).unwrap();

    assert_eq!(
        offsets(&specs, PackingMode::Std140),
        vec![(0, 12), (12, 4), (16, 16), (80, 16), (144, 16), (208, 4)]
    );
    assert_eq!(layout.total_size, 212);
}

#[test]
fn test_particle_block_std430() {
    // struct Particle { vec2 pos; float life; uint seed; vec3 vel; float weights[3]; mat2 rot; }
    let specs = [
        FieldSpec::new("pos", FieldType::VEC2, 1),
        FieldSpec::new("life", FieldType::FLOAT, 1),
        FieldSpec::new("seed", FieldType::UINT, 1),
        FieldSpec::new("vel", FieldType::VEC3, 1),
        FieldSpec::new("weights", FieldType::FLOAT, 3),
        FieldSpec::new("rot", FieldType::MAT2, 1),
    ];

    assert_eq!(
        offsets(&specs, PackingMode::Std430),
        vec![(0, 8), (8, 4), (12, 4), (16, 12), (28, 4), (40, 8)]
    );
    assert_eq!(
        calculate_layout(&specs, PackingMode::Std430).unwrap().total_size,
        56
    );
}

#[test]
fn test_same_fields_three_ways() {
    let specs = [
        FieldSpec::new("flag", FieldType::BOOL, 1),
        FieldSpec::new("normals", FieldType::matrix(3, 3), 1),
        FieldSpec::new("ids", FieldType::IVEC2, 2),
    ];

    let tight = calculate_layout(&specs, PackingMode::Tight).unwrap();
    let std140 = calculate_layout(&specs, PackingMode::Std140).unwrap();
    let std430 = calculate_layout(&specs, PackingMode::Std430).unwrap();

    assert_eq!(tight.total_size, 4 + 36 + 16);
    assert_eq!(std140.total_size, 16 + 48 + 32);
    assert_eq!(std430.total_size, 16 + 48 + 16);
}

fn arb_field_type() -> impl Strategy<Value = FieldType> {
    let kind = prop_oneof![
        Just(ScalarKind::Float),
        Just(ScalarKind::Int),
        Just(ScalarKind::Uint),
        Just(ScalarKind::Bool),
    ];
    prop_oneof![
        kind.clone().prop_map(FieldType::Scalar),
        (kind, 2u8..=4).prop_map(|(k, n)| FieldType::vector(k, n)),
        (2u8..=4, 2u8..=4).prop_map(|(c, r)| FieldType::matrix(c, r)),
    ]
}

fn arb_packing() -> impl Strategy<Value = PackingMode> {
    prop_oneof![
        Just(PackingMode::Tight),
        Just(PackingMode::Std140),
        Just(PackingMode::Std430),
    ]
}

proptest! {
    #[test]
    fn layout_is_deterministic_and_non_overlapping(
        types in prop::collection::vec((arb_field_type(), 1u32..6), 1..12),
        packing in arb_packing(),
    ) {
        let specs: Vec<FieldSpec> = types
            .iter()
            .enumerate()
            .map(|(i, (ty, arity))| FieldSpec::new(format!("f{}", i), *ty, *arity))
            .collect();

        let first = calculate_layout(&specs, packing).unwrap();
        let second = calculate_layout(&specs, packing).unwrap();
        prop_assert_eq!(&first, &second);

        for field in &first.fields {
            prop_assert_eq!(field.offset % field.alignment, 0);
            prop_assert!(field.stride >= field.field_type.column_size());
            if packing == PackingMode::Std140 && (field.arity > 1 || field.field_type.is_matrix()) {
                prop_assert_eq!(field.stride % 16, 0);
            }
        }
        for pair in first.fields.windows(2) {
            prop_assert!(pair[0].end() <= pair[1].offset);
        }
        let last = first.fields.last().unwrap();
        prop_assert_eq!(first.total_size, last.end());
    }
}
