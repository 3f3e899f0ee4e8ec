// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model files.
//!
//! The extension picks the format. `.egads` files are the engine's native
//! dump followed by an attribute trailer that records the attributes of the
//! model, its bodies and their sub-objects by map index:
//!
//! ```text
//! ##EGADS HEADER FILE-REV 1 ##
//! <model attr count>
//! <records>
//!   <solid> <shells> <faces> <loops> <edges> <nodes> <body attr count>
//! <records>
//!     <kind> <0-based index> <attr count>
//! <records>
//!     0 0 0
//! ```
//!
//! `kind` is 1 for shells, 2 faces, 3 loops, 4 edges and 5 nodes. Each
//! record is `type nameLength valueLength`, the name, then the values.

use std::fmt::Write as _;
use std::path::Path;

use egads_engine::{FileFormat, GeometryEngine, ShapeKind};
use smallvec::SmallVec;

use crate::attribute::{valid_name, AttrStore, AttrType, AttrValue};
use crate::blind::Blind;
use crate::context::Context;
use crate::error::{EgadsError, Result};
use crate::object::*;

const TRAILER_MARKER: &str = "##EGADS HEADER FILE-REV 1 ##";

/// Entity kinds of the trailer, in write order.
const TRAILER_KINDS: [(i32, ObjectClass); 5] = [
    (1, ObjectClass::Shell),
    (2, ObjectClass::Face),
    (3, ObjectClass::Loop),
    (4, ObjectClass::Edge),
    (5, ObjectClass::Node),
];

/// File format and whether the attribute trailer applies.
fn format_of(path: &Path) -> Result<(FileFormat, bool)> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| EgadsError::NoData(format!("no extension in {}", path.display())))?;
    match ext.as_str() {
        "egads" => Ok((FileFormat::Native, true)),
        "brep" => Ok((FileFormat::Native, false)),
        "step" | "stp" => Ok((FileFormat::Step, false)),
        "iges" | "igs" => Ok((FileFormat::Iges, false)),
        other => Err(EgadsError::NoData(format!("unknown extension .{other}"))),
    }
}

/// Formats a real like C's `%19.12e`.
pub(crate) fn c_exp(x: f64) -> String {
    let s = format!("{x:.12e}");
    let Some((mantissa, exp)) = s.split_once('e') else {
        return format!("{s:>19}");
    };
    let (sign, digits) = match exp.strip_prefix('-') {
        Some(d) => ('-', d),
        None => ('+', exp),
    };
    format!("{:>19}", format!("{mantissa}e{sign}{digits:0>2}"))
}

fn write_records(out: &mut String, store: &AttrStore) {
    for attr in store.iter() {
        let value = &attr.value;
        let _ = writeln!(out, "{} {} {}", value.attr_type().code(), attr.name.len(), value.len());
        let _ = writeln!(out, "{}", attr.name);
        match value {
            AttrValue::Ints(v) if v.len() == 1 => {
                let _ = writeln!(out, "{}", v[0]);
            }
            AttrValue::Ints(v) => {
                for i in v {
                    let _ = write!(out, "{i} ");
                }
                out.push('\n');
            }
            AttrValue::Reals(v) if v.len() == 1 => {
                let _ = writeln!(out, "{}", c_exp(v[0]));
            }
            AttrValue::Reals(v) => {
                for r in v {
                    let _ = write!(out, "{} ", c_exp(*r));
                }
                out.push('\n');
            }
            AttrValue::Str(s) if !s.is_empty() => {
                let _ = writeln!(out, "#{s}");
            }
            AttrValue::Str(_) => {}
        }
    }
}

/// Whitespace-token reader over the trailer text.
struct Trailer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Trailer<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn token(&mut self) -> Option<&'a str> {
        let rest = &self.text[self.pos..];
        let start = rest.len() - rest.trim_start().len();
        let rest = &rest[start..];
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.pos += start + len;
        Some(&rest[..len])
    }

    fn int(&mut self) -> Option<i64> {
        self.token()?.parse().ok()
    }

    fn count(&mut self) -> Option<usize> {
        usize::try_from(self.int()?).ok()
    }

    /// Skips past the next `#` and takes `len` bytes.
    fn string(&mut self, len: usize) -> Option<&'a str> {
        let hash = self.text[self.pos..].find('#')?;
        let start = self.pos + hash + 1;
        let end = start.checked_add(len)?;
        let s = self.text.get(start..end)?;
        self.pos = end;
        Some(s)
    }

    /// Reads `len` numeric tokens. Every token takes at least one byte, so
    /// a length past the end of the text is rejected before reserving.
    fn values<T: std::str::FromStr>(&mut self, len: usize) -> Option<SmallVec<[T; 1]>> {
        if len > self.text.len() - self.pos {
            return None;
        }
        let mut v = SmallVec::new();
        v.try_reserve(len).ok()?;
        for _ in 0..len {
            v.push(self.token()?.parse().ok()?);
        }
        Some(v)
    }

    fn record(&mut self) -> Option<(&'a str, AttrValue)> {
        let atype = AttrType::from_code(i32::try_from(self.int()?).ok()?)?;
        let _name_len = self.count()?;
        let len = self.count()?;
        let name = self.token()?;
        let value = match atype {
            AttrType::Int => AttrValue::Ints(self.values(len)?),
            AttrType::Real => AttrValue::Reals(self.values(len)?),
            AttrType::String if len == 0 => AttrValue::Str(String::new()),
            AttrType::String => AttrValue::Str(self.string(len)?.to_string()),
        };
        Some((name, value))
    }
}

impl<E: GeometryEngine> Context<E> {
    // --- Save ---

    /// Writes a model to `path`. Existing files are refused unless
    /// [`Config::overwrite_files`](crate::Config::overwrite_files) is set.
    pub fn save_model(&self, model: Ego, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let key = self.live_key(model)?;
        if self.class_of(key) != ObjectClass::Model {
            return Err(EgadsError::NotAModel);
        }
        if path.as_os_str().is_empty() {
            egads_log!(self, warn, "empty file name");
            return Err(EgadsError::NoName);
        }
        if path.exists() && !self.config.overwrite_files {
            egads_log!(self, warn, path = %path.display(), "file exists");
            return Err(EgadsError::WriteError(format!("{} exists", path.display())));
        }
        let (format, trailer) = format_of(path)?;

        let mut buf: Vec<u8> = Vec::new();
        self.engine
            .write_shape(self.shape_of(key)?, format, &mut buf)
            .map_err(|e| {
                egads_log!(self, warn, error = %e, "engine write failed");
                EgadsError::WriteError(e.to_string())
            })?;
        if trailer {
            if buf.last() != Some(&b'\n') {
                buf.push(b'\n');
            }
            buf.extend_from_slice(self.attribute_trailer(key)?.as_bytes());
        }
        std::fs::write(path, &buf).map_err(|e| EgadsError::WriteError(e.to_string()))?;
        egads_log!(self, info, path = %path.display(), bytes = buf.len(), "model saved");
        Ok(())
    }

    fn attribute_trailer(&self, model: ObjectKey) -> Result<String> {
        let mut out = String::new();
        let _ = writeln!(out, "{TRAILER_MARKER}");
        let empty = AttrStore::default();
        let store = self.attrs_of(model).unwrap_or(&empty);
        let _ = writeln!(out, "{}", store.len());
        write_records(&mut out, store);

        let bodies = match self.blind(model)? {
            Blind::Model(m) => m.bodies.clone(),
            _ => return Err(EgadsError::NotAModel),
        };
        for body in bodies {
            let data = self.body_data(body)?;
            let solid = usize::from(self.objects[body].mtype == MemberType::Body(BodyType::SolidBody));
            let store = self.attrs_of(body).unwrap_or(&empty);
            let _ = writeln!(
                out,
                "  {}  {}  {}  {}  {}  {}  {}",
                solid,
                data.shells.len(),
                data.faces.len(),
                data.loops.len(),
                data.edges.len(),
                data.nodes.len(),
                store.len()
            );
            write_records(&mut out, store);
            for (kind, class) in TRAILER_KINDS {
                let Some(map) = data.map(class) else { continue };
                for (i, &obj) in map.objs.iter().enumerate() {
                    let Some(store) = self.attrs_of(obj).filter(|s| s.len() > 0) else {
                        continue;
                    };
                    let _ = writeln!(out, "    {kind} {i} {}", store.len());
                    write_records(&mut out, store);
                }
            }
            let _ = writeln!(out, "    0 0 0");
        }
        Ok(out)
    }

    // --- Load ---

    /// Reads a model from `path`. The model is owned by the context and its
    /// bodies point at it as their top object.
    pub fn load_model(&mut self, path: impl AsRef<Path>) -> Result<Ego> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(EgadsError::NoName);
        }
        if !path.exists() {
            egads_log!(self, warn, path = %path.display(), "file not found");
            return Err(EgadsError::NotFound(path.display().to_string()));
        }
        let (format, has_trailer) = format_of(path)?;
        let text = std::fs::read_to_string(path).map_err(|e| EgadsError::LoadFailed(e.to_string()))?;
        let (shape_text, trailer) = match (has_trailer, text.split_once(TRAILER_MARKER)) {
            (true, Some((shape, rest))) => (shape, Some(rest)),
            _ => (text.as_str(), None),
        };

        let shape = self.engine.read_shape(format, shape_text).map_err(|e| {
            egads_log!(self, warn, error = %e, "engine read failed");
            EgadsError::LoadFailed(e.to_string())
        })?;
        let compound = match self.engine.shape_kind(&shape)? {
            ShapeKind::Compound => shape,
            _ => self.engine.make_compound(&[shape])?,
        };
        let model = self.model_from_compound(compound)?;
        self.add_owner(model, self.root)?;

        match trailer {
            Some(rest) => {
                if self.apply_trailer(model, rest).is_none() {
                    egads_log!(self, debug, path = %path.display(), "attribute trailer stopped early");
                }
            }
            None if has_trailer => {
                egads_log!(self, info, path = %path.display(), "no attribute header");
            }
            None => {}
        }
        egads_log!(self, info, path = %path.display(), "model loaded");
        Ok(self.ego(model))
    }

    fn read_records(&mut self, t: &mut Trailer<'_>, obj: ObjectKey, count: usize) -> Option<()> {
        for _ in 0..count {
            let (name, value) = t.record()?;
            if valid_name(name) {
                self.set_attr(obj, name, value).ok()?;
            }
        }
        Some(())
    }

    /// Applies the attribute trailer. Returns `None` where it stops early.
    fn apply_trailer(&mut self, model: ObjectKey, text: &str) -> Option<()> {
        let mut t = Trailer::new(text);
        let count = t.count()?;
        self.read_records(&mut t, model, count)?;

        let bodies = match self.blind(model).ok()? {
            Blind::Model(m) => m.bodies.clone(),
            _ => return None,
        };
        for body in bodies {
            let mut header = [0usize; 7];
            for h in header.iter_mut() {
                *h = t.count()?;
            }
            let found = {
                let data = self.body_data(body).ok()?;
                let solid = usize::from(self.objects[body].mtype == MemberType::Body(BodyType::SolidBody));
                [
                    solid,
                    data.shells.len(),
                    data.faces.len(),
                    data.loops.len(),
                    data.edges.len(),
                    data.nodes.len(),
                ]
            };
            if header[..6] != found[..] {
                egads_log!(self, debug, read = ?&header[..6], found = ?found, "attribute mismatch");
                return None;
            }
            self.read_records(&mut t, body, header[6])?;
            loop {
                let kind = t.int()?;
                let index = t.count()?;
                let count = t.count()?;
                if kind == 0 {
                    break;
                }
                let class = TRAILER_KINDS.iter().find(|(k, _)| i64::from(*k) == kind)?.1;
                let obj = *self.body_data(body).ok()?.map(class)?.objs.get(index)?;
                self.read_records(&mut t, obj, count)?;
            }
        }
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttrData;
    use crate::config::Config;
    use egads_engine::Primitive;
    use egads_kernel::Kernel;

    fn ctx(overwrite: bool) -> Context<Kernel> {
        Context::open_with_config(
            Kernel,
            Config {
                out_level: 0,
                overwrite_files: overwrite,
                tess_max_points: 10000,
            },
        )
    }

    fn box_model(ctx: &mut Context<Kernel>) -> Ego {
        let body = ctx
            .make_solid_body(&Primitive::Box {
                corner: [0.0; 3],
                size: [1.0, 2.0, 3.0],
            })
            .unwrap();
        let faces = ctx.get_body_topos(body, None, ObjectClass::Face).unwrap();
        ctx.attribute_add(faces[3], "bc", AttrData::Str("wall")).unwrap();
        ctx.attribute_add(body, "id", AttrData::Ints(&[4, 5])).unwrap();
        let model = ctx.make_model(&[body]).unwrap();
        ctx.attribute_add(model, "scale", AttrData::Reals(&[0.25])).unwrap();
        model
    }

    #[test]
    fn c_style_exponents() {
        assert_eq!(c_exp(3.5), " 3.500000000000e+00");
        assert_eq!(c_exp(-1.25e-7), "-1.250000000000e-07");
        assert_eq!(c_exp(6.02e123), "6.020000000000e+123");
    }

    #[test]
    fn extensions_pick_the_format() {
        assert_eq!(format_of(Path::new("a.EGADS")).unwrap(), (FileFormat::Native, true));
        assert_eq!(format_of(Path::new("a.stp")).unwrap(), (FileFormat::Step, false));
        assert!(matches!(format_of(Path::new("a")), Err(EgadsError::NoData(_))));
        assert!(matches!(format_of(Path::new("a.obj")), Err(EgadsError::NoData(_))));
    }

    #[test]
    fn trailer_reader_handles_strings_with_blanks() {
        let mut t = Trailer::new("3 4 9\nnote\n#two words\n1 1 2\nn\n7 8 \n");
        let (name, value) = t.record().unwrap();
        assert_eq!(name, "note");
        assert_eq!(value, AttrValue::Str("two words".into()));
        let (name, value) = t.record().unwrap();
        assert_eq!(name, "n");
        assert_eq!(value, AttrValue::Ints(SmallVec::from_slice(&[7, 8])));
        assert!(t.record().is_none());
    }

    #[test]
    fn egads_round_trip_keeps_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box.egads");
        let mut ctx = ctx(false);
        let model = box_model(&mut ctx);
        ctx.save_model(model, &path).unwrap();
        assert!(matches!(ctx.save_model(model, &path), Err(EgadsError::WriteError(_))));

        let loaded = ctx.load_model(&path).unwrap();
        assert_eq!(ctx.attribute_ret(loaded, "scale").unwrap(), AttrData::Reals(&[0.25]));
        assert_eq!(ctx.owners(loaded).unwrap(), vec![ctx.context_handle()]);
        let info = ctx.get_topology(loaded).unwrap();
        assert_eq!(info.children.len(), 1);
        let body = info.children[0];
        assert_eq!(ctx.get_info(body).unwrap().top, loaded);
        assert_eq!(ctx.attribute_ret(body, "id").unwrap(), AttrData::Ints(&[4, 5]));
        let faces = ctx.get_body_topos(body, None, ObjectClass::Face).unwrap();
        assert_eq!(faces.len(), 6);
        assert_eq!(ctx.attribute_ret(faces[3], "bc").unwrap(), AttrData::Str("wall"));
        assert_eq!(ctx.attribute_num(faces[2]).unwrap(), 0);
    }

    #[test]
    fn overwrite_is_configurable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box.brep");
        let mut ctx = ctx(true);
        let model = box_model(&mut ctx);
        ctx.save_model(model, &path).unwrap();
        ctx.save_model(model, &path).unwrap();
        let loaded = ctx.load_model(&path).unwrap();
        assert_eq!(ctx.attribute_num(loaded).unwrap(), 0);
    }

    #[test]
    fn save_and_load_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ctx(false);
        let model = box_model(&mut ctx);
        let node = ctx.make_node(&[0.0; 3]).unwrap();
        assert_eq!(ctx.save_model(node, dir.path().join("n.egads")), Err(EgadsError::NotAModel));
        assert_eq!(ctx.save_model(model, ""), Err(EgadsError::NoName));
        assert!(matches!(
            ctx.save_model(model, dir.path().join("m.txt")),
            Err(EgadsError::NoData(_))
        ));
        assert!(matches!(
            ctx.save_model(model, dir.path().join("m.step")),
            Err(EgadsError::WriteError(_))
        ));
        assert!(matches!(
            ctx.load_model(dir.path().join("missing.egads")),
            Err(EgadsError::NotFound(_))
        ));
        let junk = dir.path().join("junk.egads");
        std::fs::write(&junk, "not a model").unwrap();
        assert!(matches!(ctx.load_model(&junk), Err(EgadsError::LoadFailed(_))));
    }

    #[test]
    fn oversized_value_length_stops_the_trailer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box.egads");
        let mut ctx = ctx(false);
        let model = box_model(&mut ctx);
        ctx.save_model(model, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let edited = text.replacen("2 5 1\nscale", "2 5 4611686018427387903\nscale", 1);
        assert_ne!(text, edited);
        std::fs::write(&path, edited).unwrap();

        let loaded = ctx.load_model(&path).unwrap();
        assert_eq!(ctx.attribute_num(loaded).unwrap(), 0);
        assert_eq!(ctx.get_topology(loaded).unwrap().children.len(), 1);

        let mut t = Trailer::new("1 1 9223372036854775807\nn\n7\n");
        assert!(t.record().is_none());
        let mut t = Trailer::new("3 1 9223372036854775807\ns\n#x\n");
        assert!(t.record().is_none());
    }

    #[test]
    fn mismatched_trailer_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box.egads");
        let mut ctx = ctx(false);
        let model = box_model(&mut ctx);
        ctx.save_model(model, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let edited = text.replacen("  1  1  6  6  12  8  1", "  1  1  6  6  12  9  1", 1);
        assert_ne!(text, edited);
        std::fs::write(&path, edited).unwrap();

        let loaded = ctx.load_model(&path).unwrap();
        assert_eq!(ctx.attribute_num(loaded).unwrap(), 1);
        let body = ctx.get_topology(loaded).unwrap().children[0];
        assert_eq!(ctx.attribute_num(body).unwrap(), 0);
    }
}
