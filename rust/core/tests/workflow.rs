// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Build, tessellate, copy, save and reload a small part.

use approx::assert_relative_eq;
use egads::{
    AttrData, BodyType, Config, Context, CurveDef, EgadsError, Ego, GeomDef, Matrix, ObjectClass,
    Sense, TessParams,
};
use egads_kernel::Kernel;

const LIFT: Matrix = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 10.0,
];

fn open() -> Context<Kernel> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Context::open_with_config(
        Kernel,
        Config {
            out_level: 1,
            overwrite_files: false,
            tess_max_points: 10000,
        },
    )
}

/// A 2 x 1 rectangle in the xy plane.
fn rectangle(ctx: &mut Context<Kernel>) -> Ego {
    let pts = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
    let nodes: Vec<Ego> = pts.iter().map(|p| ctx.make_node(p).unwrap()).collect();
    let mut uses = Vec::new();
    for i in 0..4 {
        let (a, b) = (pts[i], pts[(i + 1) % 4]);
        let len = ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt();
        let def = GeomDef::Curve(CurveDef::Line {
            origin: a,
            direction: [(b[0] - a[0]) / len, (b[1] - a[1]) / len, 0.0],
        });
        let line = ctx.make_geometry(ObjectClass::Curve, &def, None).unwrap();
        let edge = ctx
            .make_edge(line, &[nodes[i], nodes[(i + 1) % 4]], [0.0, len])
            .unwrap();
        uses.push((edge, Sense::Forward));
    }
    ctx.make_loop(&uses, None, &[]).unwrap()
}

#[test]
fn rectangle_to_solid_and_back() {
    let mut ctx = open();
    let lp = rectangle(&mut ctx);
    let face = ctx.make_face_from_loop(lp, Sense::Forward).unwrap();
    ctx.attribute_add(face, "name", AttrData::Str("base")).unwrap();
    let sheet = ctx.make_body(BodyType::FaceBody, &[face]).unwrap();
    let solid = ctx.extrude(sheet, 3.0, &[0.0, 0.0, 1.0]).unwrap();

    assert_eq!(ctx.get_body_topos(solid, None, ObjectClass::Node).unwrap().len(), 8);
    assert_eq!(ctx.get_body_topos(solid, None, ObjectClass::Edge).unwrap().len(), 12);
    let faces = ctx.get_body_topos(solid, None, ObjectClass::Face).unwrap();
    assert_eq!(faces.len(), 6);
    let named: Vec<&Ego> = faces
        .iter()
        .filter(|&&f| ctx.attribute_ret(f, "name").is_ok())
        .collect();
    assert_eq!(named.len(), 1);

    // Tessellation top-references the solid.
    let tess = ctx.make_tess_body(solid, TessParams::new(1.0, 0.01, 15.0)).unwrap();
    let mut points = 0;
    for i in 1..=faces.len() {
        let f = ctx.get_tess_face(tess, i).unwrap();
        assert!(!f.tris.is_empty());
        points += f.xyz.len();
    }
    assert!(points >= 24);

    // A lifted copy keeps the face attribute at the same index.
    let lift = ctx.make_transform(&LIFT).unwrap();
    let copy = ctx.copy_object(solid, Some(lift)).unwrap();
    let copied = ctx.get_body_topos(copy, None, ObjectClass::Face).unwrap();
    for (a, b) in faces.iter().zip(&copied) {
        assert_eq!(
            ctx.attribute_ret(*a, "name").is_ok(),
            ctx.attribute_ret(*b, "name").is_ok()
        );
    }
    for n in ctx.get_body_topos(copy, None, ObjectClass::Node).unwrap() {
        let z = ctx.get_topology(n).unwrap().limits[2];
        assert!(z >= 10.0 - 1e-9 && z <= 13.0 + 1e-9);
    }

    // Save both solids in one model and read them back.
    ctx.delete_object(tess).unwrap();
    let model = ctx.make_model(&[solid, copy]).unwrap();
    assert!(matches!(
        ctx.make_model(&[solid]),
        Err(EgadsError::ReferenceClass(_))
    ));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("part.egads");
    ctx.save_model(model, &path).unwrap();

    let loaded = ctx.load_model(&path).unwrap();
    let bodies = ctx.get_topology(loaded).unwrap().children;
    assert_eq!(bodies.len(), 2);
    for &b in &bodies {
        let faces = ctx.get_body_topos(b, None, ObjectClass::Face).unwrap();
        let named = faces
            .iter()
            .filter(|&&f| ctx.attribute_ret(f, "name") == Ok(AttrData::Str("base")))
            .count();
        assert_eq!(named, 1);
    }

    let report = ctx.close();
    assert!(report.undeleted.is_empty(), "left behind: {:?}", report.undeleted);
}

#[test]
fn geometry_round_trip_through_a_grid() {
    let mut ctx = open();
    let def = GeomDef::Curve(CurveDef::Circle {
        frame: egads::Frame::xy([0.0; 3]),
        radius: 2.0,
    });
    let circle = ctx.make_geometry(ObjectClass::Curve, &def, None).unwrap();
    let tess = ctx
        .make_tess_geom(circle, &[0.0, std::f64::consts::PI], [9, 0])
        .unwrap();
    let grid = ctx.get_tess_geom(tess).unwrap();
    assert_eq!(grid.xyz.len(), 9);
    for p in grid.xyz {
        assert_relative_eq!((p[0] * p[0] + p[1] * p[1]).sqrt(), 2.0, epsilon = 1e-9);
    }
    assert_relative_eq!(grid.xyz[8][0], -2.0, epsilon = 1e-9);

    // The grid holds the circle until the tessellation goes away.
    assert_eq!(ctx.delete_object(circle).unwrap(), egads::DerefStatus::InUse(1));
    assert_eq!(ctx.delete_object(tess).unwrap(), egads::DerefStatus::Destroyed);
    assert_eq!(ctx.delete_object(circle).unwrap(), egads::DerefStatus::Destroyed);
    assert_eq!(ctx.active_count(), 0);
}
