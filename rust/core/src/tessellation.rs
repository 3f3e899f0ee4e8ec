// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tessellation objects.
//!
//! A tessellation is either a parameter grid over one curve or surface, or
//! a discretization of every edge and face of a body. It top-references its
//! source, so the source (or the model holding it) stays alive until the
//! tessellation is deleted.

use egads_engine::{EdgeMesh, FaceMesh, GeometryEngine, TessParams, Vec3};

use crate::blind::{Blind, TessData, TessKind};
use crate::context::Context;
use crate::error::{EgadsError, Result};
use crate::object::*;

/// Grid returned by [`Context::get_tess_geom`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessGeom<'a> {
    /// Points along `u` and `v`; `v` is 0 for curves.
    pub sizes: [usize; 2],
    /// Row-major points, `u` varying fastest.
    pub xyz: &'a [Vec3],
    /// Parameter limits the grid spans: `[t0, t1]` or `[u0, u1, v0, v1]`.
    pub params: &'a [f64],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessEdge<'a> {
    pub xyz: &'a [Vec3],
    pub t: &'a [f64],
}

/// Triangulation of one face. Triangle indices are 0-based into `xyz`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessFace<'a> {
    pub xyz: &'a [Vec3],
    pub uv: &'a [[f64; 2]],
    pub tris: &'a [[usize; 3]],
}

/// Evenly spaced parameter `i` of `n` over `[lo, hi]`, reversed for negative
/// sizes.
fn grid_param(lo: f64, hi: f64, i: usize, n: usize, reversed: bool) -> f64 {
    let i = if reversed { n - i - 1 } else { i };
    lo + i as f64 * (hi - lo) / (n - 1) as f64
}

impl<E: GeometryEngine> Context<E> {
    fn tess_data(&self, tess: Ego) -> Result<&TessData> {
        let key = self.live_key(tess)?;
        if self.class_of(key) != ObjectClass::Tessellation {
            return Err(EgadsError::NotATessellation);
        }
        match self.blind(key) {
            Ok(Blind::Tessellation(t)) => Ok(t),
            _ => {
                egads_log!(self, error, "tessellation without payload");
                Err(EgadsError::NotFound("tessellation data".into()))
            }
        }
    }

    /// Stores a tessellation of `src` and wires its references.
    fn finish_tess(&mut self, src: ObjectKey, kind: TessKind) -> Result<Ego> {
        let class = self.class_of(src);
        let blind = Blind::Tessellation(TessData { src, kind });
        let key = self.alloc_record(ObjectClass::Tessellation, MemberType::Source(class), Some(blind), self.root)?;
        self.add_owner(key, self.root)?;
        self.add_top_owner(src, key)?;
        Ok(self.ego(key))
    }

    // --- Builders ---

    /// Evaluates a curve or surface on a regular grid.
    ///
    /// `limits` holds `[t0, t1]` for a curve and `[u0, u1, v0, v1]` for a
    /// surface. A negative size runs that direction backwards.
    pub fn make_tess_geom(&mut self, geom: Ego, limits: &[f64], sizes: [i32; 2]) -> Result<Ego> {
        let key = self.live_key(geom)?;
        let class = self.class_of(key);
        if class != ObjectClass::Curve && class != ObjectClass::Surface {
            return Err(EgadsError::NotAGeometry(class.to_string()));
        }
        let nu = sizes[0].unsigned_abs() as usize;
        let nv = if class == ObjectClass::Surface {
            sizes[1].unsigned_abs() as usize
        } else {
            0
        };
        if nu < 2 || (class == ObjectClass::Surface && nv < 2) {
            egads_log!(self, error, nu, nv, "tessellation grid too small");
            return Err(EgadsError::IndexError(format!("grid size {nu} x {nv}")));
        }
        let want = if class == ObjectClass::Surface { 4 } else { 2 };
        if limits.len() < want {
            return Err(EgadsError::IndexError(format!("{} limits, need {want}", limits.len())));
        }
        let count = nu * nv.max(1);
        if count > self.config.tess_max_points {
            egads_log!(self, error, count, max = self.config.tess_max_points, "tessellation too large");
            return Err(EgadsError::RangeError(format!("{count} grid points")));
        }

        let mut xyz = crate::memory::try_vec(count)?;
        if class == ObjectClass::Surface {
            for j in 0..nv {
                let v = grid_param(limits[2], limits[3], j, nv, sizes[1] < 0);
                for i in 0..nu {
                    let u = grid_param(limits[0], limits[1], i, nu, sizes[0] < 0);
                    xyz.push(self.evaluate(geom, &[u, v])?.point());
                }
            }
        } else {
            for i in 0..nu {
                let t = grid_param(limits[0], limits[1], i, nu, sizes[0] < 0);
                xyz.push(self.evaluate(geom, &[t])?.point());
            }
        }

        let kind = TessKind::Geometry {
            sizes: [nu, nv],
            xyz,
            params: limits[..want].to_vec(),
        };
        let tess = self.finish_tess(key, kind)?;
        egads_log!(self, debug, nu, nv, "geometry tessellated");
        Ok(tess)
    }

    /// Discretizes every edge and triangulates every face of a body, in body
    /// index order.
    pub fn make_tess_body(&mut self, body: Ego, params: TessParams) -> Result<Ego> {
        let key = self.live_key(body)?;
        if self.class_of(key) != ObjectClass::Body {
            return Err(EgadsError::NotABody);
        }
        let max = self.config.tess_max_points;
        let data = self.body_data(key)?;
        let mut edges: Vec<EdgeMesh> = Vec::with_capacity(data.edges.len());
        for shape in &data.edges.shapes {
            let mesh = self.engine.discretize_edge(shape, &params)?;
            if mesh.xyz.len() > max {
                egads_log!(self, error, points = mesh.xyz.len(), max, "edge tessellation too large");
                return Err(EgadsError::RangeError(format!("{} edge points", mesh.xyz.len())));
            }
            edges.push(mesh);
        }
        let mut faces: Vec<FaceMesh> = Vec::with_capacity(data.faces.len());
        for shape in &data.faces.shapes {
            let mesh = self.engine.triangulate_face(shape, &params)?;
            if mesh.xyz.len() > max {
                egads_log!(self, error, points = mesh.xyz.len(), max, "face tessellation too large");
                return Err(EgadsError::RangeError(format!("{} face points", mesh.xyz.len())));
            }
            faces.push(mesh);
        }

        let (nedge, nface) = (edges.len(), faces.len());
        let tess = self.finish_tess(key, TessKind::Body { params, edges, faces })?;
        egads_log!(self, debug, edges = nedge, faces = nface, "body tessellated");
        Ok(tess)
    }

    // --- Queries ---

    pub fn get_tess_geom(&self, tess: Ego) -> Result<TessGeom<'_>> {
        let data = self.tess_data(tess)?;
        match &data.kind {
            TessKind::Geometry { sizes, xyz, params } => Ok(TessGeom {
                sizes: *sizes,
                xyz,
                params,
            }),
            TessKind::Body { .. } => {
                egads_log!(self, error, "source is not a curve or surface");
                Err(EgadsError::NotAGeometry("body tessellation".into()))
            }
        }
    }

    /// The tessellation parameters of a body tessellation.
    pub fn get_tess_params(&self, tess: Ego) -> Result<TessParams> {
        match &self.tess_data(tess)?.kind {
            TessKind::Body { params, .. } => Ok(*params),
            TessKind::Geometry { .. } => Err(EgadsError::NotABody),
        }
    }

    /// Polyline of the edge at 1-based `index` in the body.
    pub fn get_tess_edge(&self, tess: Ego, index: usize) -> Result<TessEdge<'_>> {
        let TessKind::Body { edges, .. } = &self.tess_data(tess)?.kind else {
            egads_log!(self, error, "source is not a body");
            return Err(EgadsError::NotABody);
        };
        if edges.is_empty() {
            return Err(EgadsError::NoData("no edge tessellations".into()));
        }
        let mesh = index
            .checked_sub(1)
            .and_then(|i| edges.get(i))
            .ok_or_else(|| EgadsError::IndexError(format!("edge {index} of 1..={}", edges.len())))?;
        Ok(TessEdge {
            xyz: &mesh.xyz,
            t: &mesh.t,
        })
    }

    /// Triangulation of the face at 1-based `index` in the body.
    pub fn get_tess_face(&self, tess: Ego, index: usize) -> Result<TessFace<'_>> {
        let TessKind::Body { faces, .. } = &self.tess_data(tess)?.kind else {
            egads_log!(self, error, "source is not a body");
            return Err(EgadsError::NotABody);
        };
        if faces.is_empty() {
            return Err(EgadsError::NoData("no face tessellations".into()));
        }
        let mesh = index
            .checked_sub(1)
            .and_then(|i| faces.get(i))
            .ok_or_else(|| EgadsError::IndexError(format!("face {index} of 1..={}", faces.len())))?;
        Ok(TessFace {
            xyz: &mesh.xyz,
            uv: &mesh.uv,
            tris: &mesh.tris,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::geometry::GeomDef;
    use approx::assert_relative_eq;
    use egads_engine::{CurveDef, Frame, Primitive, SurfaceDef};
    use egads_kernel::Kernel;

    fn ctx() -> Context<Kernel> {
        Context::open_with_config(
            Kernel,
            Config {
                out_level: 0,
                overwrite_files: false,
                tess_max_points: 1000,
            },
        )
    }

    #[test]
    fn curve_grid() {
        let mut ctx = ctx();
        let def = GeomDef::Curve(CurveDef::Line {
            origin: [0.0; 3],
            direction: [1.0, 0.0, 0.0],
        });
        let line = ctx.make_geometry(ObjectClass::Curve, &def, None).unwrap();
        let tess = ctx.make_tess_geom(line, &[0.0, 4.0], [5, 0]).unwrap();
        assert_eq!(ctx.get_info(tess).unwrap().mtype, MemberType::Source(ObjectClass::Curve));
        let grid = ctx.get_tess_geom(tess).unwrap();
        assert_eq!(grid.sizes, [5, 0]);
        assert_eq!(grid.params, &[0.0, 4.0]);
        for (i, p) in grid.xyz.iter().enumerate() {
            assert_relative_eq!(p[0], i as f64, epsilon = 1e-12);
        }

        let back = ctx.make_tess_geom(line, &[0.0, 4.0], [-5, 0]).unwrap();
        assert_relative_eq!(ctx.get_tess_geom(back).unwrap().xyz[0][0], 4.0, epsilon = 1e-12);
        assert!(matches!(ctx.make_tess_geom(line, &[0.0, 4.0], [1, 0]), Err(EgadsError::IndexError(_))));
        assert!(matches!(ctx.make_tess_geom(line, &[0.0, 1.0], [2000, 0]), Err(EgadsError::RangeError(_))));
    }

    #[test]
    fn surface_grid_runs_u_fastest() {
        let mut ctx = ctx();
        let def = GeomDef::Surface(SurfaceDef::Plane {
            frame: Frame::xy([0.0; 3]),
        });
        let plane = ctx.make_geometry(ObjectClass::Surface, &def, None).unwrap();
        let tess = ctx.make_tess_geom(plane, &[0.0, 2.0, 0.0, 1.0], [3, 2]).unwrap();
        let grid = ctx.get_tess_geom(tess).unwrap();
        assert_eq!(grid.sizes, [3, 2]);
        assert_eq!(grid.xyz.len(), 6);
        assert_relative_eq!(grid.xyz[1][0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(grid.xyz[3][1], 1.0, epsilon = 1e-12);
        assert!(matches!(ctx.get_tess_edge(tess, 1), Err(EgadsError::NotABody)));
    }

    #[test]
    fn only_geometry_gets_a_grid() {
        let mut ctx = ctx();
        let node = ctx.make_node(&[0.0; 3]).unwrap();
        assert!(matches!(ctx.make_tess_geom(node, &[0.0, 1.0], [2, 0]), Err(EgadsError::NotAGeometry(_))));
        assert_eq!(
            ctx.make_tess_body(node, TessParams::new(0.5, 0.01, 15.0)),
            Err(EgadsError::NotABody)
        );
        assert_eq!(ctx.get_tess_geom(node), Err(EgadsError::NotATessellation));
    }

    #[test]
    fn body_tessellation_holds_the_body() {
        let mut ctx = ctx();
        let body = ctx
            .make_solid_body(&Primitive::Box {
                corner: [0.0; 3],
                size: [1.0; 3],
            })
            .unwrap();
        let tess = ctx.make_tess_body(body, TessParams::new(0.5, 0.01, 15.0)).unwrap();
        assert_eq!(ctx.get_tess_params(tess).unwrap().max_length, 0.5);

        for i in 1..=12 {
            let edge = ctx.get_tess_edge(tess, i).unwrap();
            assert_eq!(edge.xyz.len(), edge.t.len());
            assert!(edge.xyz.len() >= 3);
        }
        assert!(matches!(ctx.get_tess_edge(tess, 0), Err(EgadsError::IndexError(_))));
        assert!(matches!(ctx.get_tess_edge(tess, 13), Err(EgadsError::IndexError(_))));

        let face = ctx.get_tess_face(tess, 6).unwrap();
        assert_eq!(face.xyz.len(), face.uv.len());
        assert!(!face.tris.is_empty());
        assert!(face.tris.iter().flatten().all(|&i| i < face.xyz.len()));
        assert!(matches!(ctx.get_tess_face(tess, 7), Err(EgadsError::IndexError(_))));

        assert_eq!(ctx.delete_object(body).unwrap(), DerefStatus::InUse(1));
        assert_eq!(ctx.delete_object(tess).unwrap(), DerefStatus::Destroyed);
        assert_eq!(ctx.owner_count(body).unwrap(), 1);
        assert_eq!(ctx.delete_object(body).unwrap(), DerefStatus::Destroyed);
        assert_eq!(ctx.active_count(), 0);
    }
}
