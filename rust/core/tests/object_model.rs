// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pool, reference and attribute behavior through the public API.

use egads::{AttrData, AttrType, Config, Context, DerefStatus, EgadsError, Ego, ObjectClass};
use egads_kernel::Kernel;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn open() -> Context<Kernel> {
    init_tracing();
    Context::open_with_config(
        Kernel,
        Config {
            out_level: 1,
            overwrite_files: false,
            tess_max_points: 10000,
        },
    )
}

fn node(ctx: &mut Context<Kernel>, x: f64) -> Ego {
    ctx.make_node(&[x, 0.0, 0.0]).unwrap()
}

#[test]
fn pool_reuses_the_most_recently_freed_record() {
    let mut ctx = open();
    let objs: Vec<Ego> = (0..5).map(|i| node(&mut ctx, i as f64)).collect();
    assert_eq!(ctx.allocation_count(), 5);

    assert_eq!(ctx.delete_object(objs[1]).unwrap(), DerefStatus::Destroyed);
    assert_eq!(ctx.delete_object(objs[3]).unwrap(), DerefStatus::Destroyed);
    assert_eq!(ctx.pool_len(), 2);

    let first = node(&mut ctx, 10.0);
    assert_eq!(first.slot(), objs[3].slot());
    let second = node(&mut ctx, 11.0);
    assert_eq!(second.slot(), objs[1].slot());
    assert_eq!(ctx.allocation_count(), 5);
    assert_eq!(ctx.pool_len(), 0);

    // Old handles stay dead after their slots are reused.
    assert_eq!(ctx.get_info(objs[3]), Err(EgadsError::Empty));
    let third = node(&mut ctx, 12.0);
    assert_eq!(ctx.allocation_count(), 6);
    assert_eq!(ctx.get_info(third).unwrap().class, ObjectClass::Node);
}

#[test]
fn object_survives_until_its_last_owner_lets_go() {
    let mut ctx = open();
    let child = node(&mut ctx, 0.0);
    let owners: Vec<Ego> = (1..4).map(|i| node(&mut ctx, i as f64)).collect();
    for (i, &o) in owners.iter().enumerate() {
        assert_eq!(ctx.reference_object(child, o).unwrap(), i + 2);
    }
    for &o in &owners {
        assert_eq!(ctx.dereference_object(child, Some(o)).unwrap(), DerefStatus::Released);
        assert!(ctx.is_live(child));
    }
    assert_eq!(ctx.owner_count(child).unwrap(), 1);
    assert_eq!(ctx.delete_object(child).unwrap(), DerefStatus::Destroyed);
    assert!(!ctx.is_live(child));
}

#[test]
fn delete_is_refused_while_another_owner_remains() {
    let mut ctx = open();
    let a = node(&mut ctx, 0.0);
    let b = node(&mut ctx, 1.0);
    let line = ctx
        .make_geometry(
            ObjectClass::Curve,
            &egads::GeomDef::Curve(egads::CurveDef::Line {
                origin: [0.0; 3],
                direction: [1.0, 0.0, 0.0],
            }),
            None,
        )
        .unwrap();
    let edge = ctx.make_edge(line, &[a, b], [0.0, 1.0]).unwrap();

    assert_eq!(ctx.owners(a).unwrap(), vec![ctx.context_handle(), edge]);
    assert_eq!(ctx.delete_object(a).unwrap(), DerefStatus::InUse(1));
    assert_eq!(ctx.get_info(a).unwrap().class, ObjectClass::Node);

    assert_eq!(ctx.delete_object(edge).unwrap(), DerefStatus::Destroyed);
    assert_eq!(ctx.owner_count(a).unwrap(), 1);
    assert_eq!(ctx.delete_object(a).unwrap(), DerefStatus::Destroyed);
}

#[test]
fn context_edge_then_owner_edge() {
    let mut ctx = open();
    let a = node(&mut ctx, 0.0);
    let owner = node(&mut ctx, 1.0);
    assert_eq!(ctx.owner_count(a).unwrap(), 1);
    assert_eq!(ctx.reference_object(a, owner).unwrap(), 2);

    assert_eq!(ctx.dereference_object(a, None).unwrap(), DerefStatus::Released);
    assert_eq!(ctx.owners(a).unwrap(), vec![owner]);
    assert_eq!(ctx.dereference_object(a, Some(owner)).unwrap(), DerefStatus::Destroyed);
    assert_eq!(ctx.get_info(a), Err(EgadsError::Empty));
    assert_eq!(ctx.pool_len(), 1);
}

#[test]
fn real_attribute_round_trips_exactly() {
    let mut ctx = open();
    let a = node(&mut ctx, 0.0);
    ctx.attribute_add(a, "thickness", AttrData::Reals(&[3.5])).unwrap();
    let got = ctx.attribute_ret(a, "thickness").unwrap();
    assert_eq!(got.attr_type(), AttrType::Real);
    assert_eq!(got.len(), 1);
    match got {
        AttrData::Reals(v) => assert_eq!(v[0].to_bits(), 3.5f64.to_bits()),
        other => panic!("unexpected {other:?}"),
    }

    ctx.attribute_add(a, "thickness", AttrData::Ints(&[1, 2, 3])).unwrap();
    assert_eq!(ctx.attribute_num(a).unwrap(), 1);
    let entry = ctx.attribute_get(a, 1).unwrap();
    assert_eq!(entry.name, "thickness");
    assert_eq!(entry.data, AttrData::Ints(&[1, 2, 3]));

    ctx.attribute_add(a, "label", AttrData::Str("left wing")).unwrap();
    assert_eq!(ctx.attribute_ret(a, "label").unwrap(), AttrData::Str("left wing"));
}

#[test]
fn attribute_dup_replaces_wholesale() {
    let mut ctx = open();
    let a = node(&mut ctx, 0.0);
    let b = node(&mut ctx, 1.0);
    ctx.attribute_add(a, "x", AttrData::Ints(&[1])).unwrap();
    ctx.attribute_add(a, "y", AttrData::Reals(&[0.5, 0.25])).unwrap();
    ctx.attribute_add(b, "z", AttrData::Str("gone")).unwrap();

    ctx.attribute_dup(a, b).unwrap();
    let once: Vec<String> = (1..=ctx.attribute_num(b).unwrap())
        .map(|i| ctx.attribute_get(b, i).unwrap().name.to_string())
        .collect();
    ctx.attribute_dup(a, b).unwrap();
    let twice: Vec<String> = (1..=ctx.attribute_num(b).unwrap())
        .map(|i| ctx.attribute_get(b, i).unwrap().name.to_string())
        .collect();
    assert_eq!(once, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(once, twice);
    assert!(matches!(ctx.attribute_ret(b, "z"), Err(EgadsError::NotFound(_))));
}

#[test]
fn close_reports_and_survives_cross_references() {
    let mut ctx = open();
    let a = node(&mut ctx, 0.0);
    let b = node(&mut ctx, 1.0);
    // a and b hold each other and nothing else.
    ctx.reference_object(a, b).unwrap();
    ctx.reference_object(b, a).unwrap();
    ctx.remove_context_ref(a).unwrap();
    ctx.remove_context_ref(b).unwrap();
    ctx.attribute_add(ctx.context_handle(), "owner", AttrData::Str("test")).unwrap();

    let report = ctx.close();
    assert_eq!(report.active, 2);
    assert_eq!(report.undeleted.len(), 2);
    assert!(report.undeleted.iter().all(|&(class, _)| class == ObjectClass::Node));
}

#[test]
fn close_releases_a_full_session() {
    let mut ctx = open();
    let body = ctx
        .make_solid_body(&egads::Primitive::Box {
            corner: [0.0; 3],
            size: [1.0; 3],
        })
        .unwrap();
    let tess = ctx
        .make_tess_body(body, egads::TessParams::new(0.5, 0.01, 15.0))
        .unwrap();
    let other = ctx
        .make_solid_body(&egads::Primitive::Box {
            corner: [2.0, 0.0, 0.0],
            size: [1.0; 3],
        })
        .unwrap();
    let model = ctx.make_model(&[other]).unwrap();
    assert!(ctx.is_live(tess) && ctx.is_live(model));
    let _loose = node(&mut ctx, 5.0);

    let report = ctx.close();
    assert!(report.active > 0);
    assert!(report.undeleted.is_empty(), "left behind: {:?}", report.undeleted);
}
