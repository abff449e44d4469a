// Copyright @yucwang 2026

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::core::bsdf::BSDF;
use crate::core::scene::{Scene, SceneObject};
use crate::integrators::photon_map::PhotonMapSettings;
use crate::materials::lambertian_diffuse::LambertianDiffuseBSDF;
use crate::materials::specular::{SpecularDielectricBSDF, SpecularMirrorBSDF};
use crate::math::constants::{Float, Vector3f};
use crate::math::spectrum::RGBSpectrum;
use crate::sensors::perspective::PerspectiveCamera;
use crate::shapes::rectangle::Rectangle;
use crate::shapes::sphere::Sphere;
use std::sync::Arc;

#[derive(Debug)]
pub enum SceneLoadError {
    Io(std::io::Error),
    Parse(String),
    MissingField(&'static str),
}

impl From<std::io::Error> for SceneLoadError {
    fn from(err: std::io::Error) -> Self {
        SceneLoadError::Io(err)
    }
}

impl std::fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneLoadError::Io(err) => write!(f, "io error: {}", err),
            SceneLoadError::Parse(message) => write!(f, "parse error: {}", message),
            SceneLoadError::MissingField(field) => write!(f, "missing field: {}", field),
        }
    }
}

pub struct SceneLoadResult {
    pub scene: Scene,
    pub integrator_type: Option<String>,
    pub photon_map_settings: Option<PhotonMapSettings>,
    pub samples_per_pixel: Option<u32>,
    pub max_depth: Option<u32>,
}

pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<Scene, SceneLoadError> {
    let result = load_scene_with_settings(path)?;
    Ok(result.scene)
}

pub fn load_scene_with_settings<P: AsRef<Path>>(path: P) -> Result<SceneLoadResult, SceneLoadError> {
    let xml = fs::read_to_string(path)?;
    parse_scene(&xml)
}

#[derive(Default)]
struct IntegratorState {
    integrator_type: String,
    integers: HashMap<String, i64>,
    floats: HashMap<String, Float>,
    booleans: HashMap<String, bool>,
}

#[derive(Default)]
struct BsdfState {
    bsdf_type: String,
    id: Option<String>,
    rgbs: HashMap<String, RGBSpectrum>,
    floats: HashMap<String, Float>,
}

#[derive(Default)]
struct ShapeState {
    shape_type: String,
    points: HashMap<String, Vector3f>,
    vectors: HashMap<String, Vector3f>,
    floats: HashMap<String, Float>,
    ref_id: Option<String>,
    inline_material: Option<Arc<dyn BSDF>>,
    emission: Option<RGBSpectrum>,
}

#[derive(Default)]
struct SensorState {
    fov_deg: Option<Float>,
    origin: Option<Vector3f>,
    target: Option<Vector3f>,
    up: Option<Vector3f>,
    width: Option<usize>,
    height: Option<usize>,
}

fn attr(element: &BytesStart, key: &str) -> Result<Option<String>, SceneLoadError> {
    let attribute = element
        .try_get_attribute(key)
        .map_err(|e| SceneLoadError::Parse(e.to_string()))?;
    match attribute {
        Some(a) => {
            let value = a
                .unescape_value()
                .map_err(|e| SceneLoadError::Parse(e.to_string()))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

fn required_attr(element: &BytesStart, key: &'static str) -> Result<String, SceneLoadError> {
    attr(element, key)?.ok_or(SceneLoadError::MissingField(key))
}

fn parse_float(value: &str) -> Result<Float, SceneLoadError> {
    value.trim().parse::<Float>()
        .map_err(|_| SceneLoadError::Parse(format!("invalid float: {}", value)))
}

fn parse_integer(value: &str) -> Result<i64, SceneLoadError> {
    value.trim().parse::<i64>()
        .map_err(|_| SceneLoadError::Parse(format!("invalid integer: {}", value)))
}

fn parse_boolean(value: &str) -> Result<bool, SceneLoadError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(SceneLoadError::Parse(format!("invalid boolean: {}", other))),
    }
}

// "x, y, z" or "x y z"
fn parse_vector3(value: &str) -> Result<Vector3f, SceneLoadError> {
    let parts: Vec<&str> = value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() != 3 {
        return Err(SceneLoadError::Parse(format!("invalid vector: {}", value)));
    }
    Ok(Vector3f::new(parse_float(parts[0])?, parse_float(parts[1])?, parse_float(parts[2])?))
}

fn parse_rgb(value: &str) -> Result<RGBSpectrum, SceneLoadError> {
    let v = parse_vector3(value)?;
    Ok(RGBSpectrum::new(v.x, v.y, v.z))
}

fn build_bsdf(state: &BsdfState) -> Result<Arc<dyn BSDF>, SceneLoadError> {
    match state.bsdf_type.as_str() {
        "diffuse" => {
            let reflectance = state.rgbs.get("reflectance")
                .copied()
                .unwrap_or(RGBSpectrum::new(0.5, 0.5, 0.5));
            Ok(Arc::new(LambertianDiffuseBSDF::new(reflectance)))
        }
        "mirror" => {
            let reflectance = state.rgbs.get("specular_reflectance")
                .copied()
                .unwrap_or(RGBSpectrum::new(1.0, 1.0, 1.0));
            Ok(Arc::new(SpecularMirrorBSDF::new(reflectance)))
        }
        "dielectric" => {
            let int_ior = state.floats.get("int_ior").copied().unwrap_or(1.5);
            if int_ior <= 0.0 {
                return Err(SceneLoadError::Parse(format!("invalid int_ior: {}", int_ior)));
            }
            let reflectance = state.rgbs.get("specular_reflectance")
                .copied()
                .unwrap_or(RGBSpectrum::new(1.0, 1.0, 1.0));
            let transmittance = state.rgbs.get("specular_transmittance")
                .copied()
                .unwrap_or(RGBSpectrum::new(1.0, 1.0, 1.0));
            Ok(Arc::new(SpecularDielectricBSDF::new(int_ior, reflectance, transmittance)))
        }
        other => Err(SceneLoadError::Parse(format!("unknown bsdf type: {}", other))),
    }
}

fn build_shape(state: &ShapeState) -> Result<Box<dyn crate::core::shape::Shape>, SceneLoadError> {
    match state.shape_type.as_str() {
        "rectangle" => {
            let origin = state.points.get("origin")
                .copied()
                .ok_or(SceneLoadError::MissingField("origin"))?;
            let edge_u = state.vectors.get("edge_u")
                .copied()
                .ok_or(SceneLoadError::MissingField("edge_u"))?;
            let edge_v = state.vectors.get("edge_v")
                .copied()
                .ok_or(SceneLoadError::MissingField("edge_v"))?;
            Ok(Box::new(Rectangle::new(origin, edge_u, edge_v)))
        }
        "sphere" => {
            let center = state.points.get("center")
                .copied()
                .ok_or(SceneLoadError::MissingField("center"))?;
            let radius = state.floats.get("radius")
                .copied()
                .ok_or(SceneLoadError::MissingField("radius"))?;
            if radius <= 0.0 {
                return Err(SceneLoadError::Parse(format!("invalid radius: {}", radius)));
            }
            Ok(Box::new(Sphere::new(center, radius)))
        }
        other => Err(SceneLoadError::Parse(format!("unknown shape type: {}", other))),
    }
}

fn build_photon_map_settings(state: &IntegratorState)
    -> Result<PhotonMapSettings, SceneLoadError> {
    let emissions = *state.integers.get("emissions")
        .ok_or(SceneLoadError::MissingField("emissions"))?;
    if emissions < 0 {
        return Err(SceneLoadError::Parse(format!("emissions must be >= 0, got {}", emissions)));
    }
    let caustic_factor = *state.floats.get("caustic_factor")
        .ok_or(SceneLoadError::MissingField("caustic_factor"))?;

    let settings = PhotonMapSettings {
        emissions: emissions as usize,
        caustic_factor,
        k_nearest_photons: state.integers.get("k_nearest_photons")
            .map(|&v| v.max(0) as usize)
            .unwrap_or(50),
        max_photons_per_octree_leaf: state.integers.get("max_photons_per_octree_leaf")
            .map(|&v| v.max(0) as usize)
            .unwrap_or(200),
        direct_visualization: state.booleans.get("direct_visualization")
            .copied()
            .unwrap_or(false),
        samples_per_pixel: state.integers.get("spp")
            .map(|&v| v.max(1) as u32)
            .unwrap_or(1),
    };
    settings.validate().map_err(SceneLoadError::Parse)?;
    Ok(settings)
}

pub fn parse_scene(xml: &str) -> Result<SceneLoadResult, SceneLoadError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut scene = Scene::new();
    let mut named_bsdfs: HashMap<String, Arc<dyn BSDF>> = HashMap::new();

    let mut integrator: Option<IntegratorState> = None;
    let mut bsdf: Option<BsdfState> = None;
    let mut shape: Option<ShapeState> = None;
    let mut sensor: Option<SensorState> = None;
    let mut in_emitter = false;
    let mut in_film = false;

    let mut integrator_type: Option<String> = None;
    let mut photon_map_settings: Option<PhotonMapSettings> = None;
    let mut samples_per_pixel: Option<u32> = None;
    let mut max_depth: Option<u32> = None;

    loop {
        let event = reader.read_event()
            .map_err(|e| SceneLoadError::Parse(e.to_string()))?;
        let is_empty = matches!(&event, Event::Empty(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                match e.name().as_ref() {
                    b"scene" => {}
                    b"integrator" => {
                        let mut state = IntegratorState::default();
                        state.integrator_type = required_attr(e, "type")?;
                        if is_empty {
                            integrator_type = Some(state.integrator_type.clone());
                        } else {
                            integrator = Some(state);
                        }
                    }
                    b"sensor" => {
                        if !is_empty {
                            sensor = Some(SensorState::default());
                        }
                    }
                    b"film" => {
                        in_film = true;
                    }
                    b"transform" => {}
                    b"lookat" => {
                        if let Some(state) = sensor.as_mut() {
                            state.origin = Some(parse_vector3(&required_attr(e, "origin")?)?);
                            state.target = Some(parse_vector3(&required_attr(e, "target")?)?);
                            state.up = Some(parse_vector3(&required_attr(e, "up")?)?);
                        }
                    }
                    b"bsdf" => {
                        let mut state = BsdfState::default();
                        state.bsdf_type = required_attr(e, "type")?;
                        state.id = attr(e, "id")?;
                        bsdf = Some(state);
                        if is_empty {
                            finalize_bsdf(&mut bsdf, &mut shape, &mut named_bsdfs)?;
                        }
                    }
                    b"shape" => {
                        let mut state = ShapeState::default();
                        state.shape_type = required_attr(e, "type")?;
                        shape = Some(state);
                    }
                    b"emitter" => {
                        if shape.is_some() {
                            let emitter_type = required_attr(e, "type")?;
                            if emitter_type != "area" {
                                return Err(SceneLoadError::Parse(
                                    format!("unknown emitter type: {}", emitter_type)));
                            }
                            in_emitter = true;
                        }
                    }
                    b"ref" => {
                        if let Some(state) = shape.as_mut() {
                            state.ref_id = Some(required_attr(e, "id")?);
                        }
                    }
                    b"integer" => {
                        let name = required_attr(e, "name")?;
                        let value = parse_integer(&required_attr(e, "value")?)?;
                        if in_film {
                            if let Some(state) = sensor.as_mut() {
                                match name.as_str() {
                                    "width" => state.width = Some(value.max(0) as usize),
                                    "height" => state.height = Some(value.max(0) as usize),
                                    _ => {}
                                }
                            }
                        } else if let Some(state) = integrator.as_mut() {
                            state.integers.insert(name, value);
                        }
                    }
                    b"float" => {
                        let name = required_attr(e, "name")?;
                        let value = parse_float(&required_attr(e, "value")?)?;
                        if let Some(state) = bsdf.as_mut() {
                            state.floats.insert(name, value);
                        } else if let Some(state) = shape.as_mut() {
                            state.floats.insert(name, value);
                        } else if let Some(state) = sensor.as_mut() {
                            if name == "fov" {
                                state.fov_deg = Some(value);
                            }
                        } else if let Some(state) = integrator.as_mut() {
                            state.floats.insert(name, value);
                        } else if name == "ior" {
                            if value <= 0.0 {
                                return Err(SceneLoadError::Parse(
                                    format!("invalid scene ior: {}", value)));
                            }
                            scene.ior = value;
                        }
                    }
                    b"boolean" => {
                        let name = required_attr(e, "name")?;
                        let value = parse_boolean(&required_attr(e, "value")?)?;
                        if let Some(state) = integrator.as_mut() {
                            state.booleans.insert(name, value);
                        }
                    }
                    b"rgb" => {
                        let name = required_attr(e, "name")?;
                        let value = parse_rgb(&required_attr(e, "value")?)?;
                        if in_emitter {
                            if let Some(state) = shape.as_mut() {
                                if name == "radiance" {
                                    state.emission = Some(value);
                                }
                            }
                        } else if let Some(state) = bsdf.as_mut() {
                            state.rgbs.insert(name, value);
                        }
                    }
                    b"point" => {
                        let name = required_attr(e, "name")?;
                        let value = parse_vector3(&required_attr(e, "value")?)?;
                        if let Some(state) = shape.as_mut() {
                            state.points.insert(name, value);
                        }
                    }
                    b"vector" => {
                        let name = required_attr(e, "name")?;
                        let value = parse_vector3(&required_attr(e, "value")?)?;
                        if let Some(state) = shape.as_mut() {
                            state.vectors.insert(name, value);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"integrator" => {
                    if let Some(state) = integrator.take() {
                        integrator_type = Some(state.integrator_type.clone());
                        match state.integrator_type.as_str() {
                            "photon_mapper" => {
                                let settings = build_photon_map_settings(&state)?;
                                samples_per_pixel = Some(settings.samples_per_pixel);
                                photon_map_settings = Some(settings);
                            }
                            "path" => {
                                max_depth = state.integers.get("max_depth")
                                    .map(|&v| v.max(1) as u32);
                                samples_per_pixel = state.integers.get("spp")
                                    .map(|&v| v.max(1) as u32);
                            }
                            other => {
                                return Err(SceneLoadError::Parse(
                                    format!("unknown integrator type: {}", other)));
                            }
                        }
                    }
                }
                b"bsdf" => {
                    finalize_bsdf(&mut bsdf, &mut shape, &mut named_bsdfs)?;
                }
                b"shape" => {
                    if let Some(state) = shape.take() {
                        let geometry = build_shape(&state)?;
                        let material = if let Some(material) = state.inline_material.clone() {
                            material
                        } else if let Some(id) = &state.ref_id {
                            named_bsdfs.get(id)
                                .cloned()
                                .ok_or_else(|| SceneLoadError::Parse(
                                    format!("unknown bsdf reference: {}", id)))?
                        } else {
                            return Err(SceneLoadError::MissingField("bsdf"));
                        };
                        let object = match state.emission {
                            Some(emission) =>
                                SceneObject::with_emission(geometry, material, emission),
                            None => SceneObject::new(geometry, material),
                        };
                        scene.add_object(object);
                    }
                }
                b"emitter" => {
                    in_emitter = false;
                }
                b"film" => {
                    in_film = false;
                }
                b"sensor" => {
                    if let Some(state) = sensor.take() {
                        let origin = state.origin.ok_or(SceneLoadError::MissingField("origin"))?;
                        let target = state.target.ok_or(SceneLoadError::MissingField("target"))?;
                        let up = state.up.ok_or(SceneLoadError::MissingField("up"))?;
                        let fov_deg = state.fov_deg.ok_or(SceneLoadError::MissingField("fov"))?;
                        let width = state.width.ok_or(SceneLoadError::MissingField("width"))?;
                        let height = state.height.ok_or(SceneLoadError::MissingField("height"))?;
                        scene.add_sensor(Box::new(PerspectiveCamera::new(
                            origin, target, up, fov_deg.to_radians(), width, height)));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(SceneLoadResult {
        scene,
        integrator_type,
        photon_map_settings,
        samples_per_pixel,
        max_depth,
    })
}

fn finalize_bsdf(bsdf: &mut Option<BsdfState>,
                 shape: &mut Option<ShapeState>,
                 named_bsdfs: &mut HashMap<String, Arc<dyn BSDF>>)
    -> Result<(), SceneLoadError> {
    if let Some(state) = bsdf.take() {
        let material = build_bsdf(&state)?;
        if let Some(shape_state) = shape.as_mut() {
            shape_state.inline_material = Some(material);
        } else if let Some(id) = state.id {
            named_bsdfs.insert(id, material);
        } else {
            return Err(SceneLoadError::MissingField("id"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::spectrum::Spectrum;

    const CORNELL: &str = r#"
        <scene>
            <integrator type="photon_mapper">
                <integer name="emissions" value="100000"/>
                <float name="caustic_factor" value="4.0"/>
                <integer name="k_nearest_photons" value="64"/>
                <integer name="max_photons_per_octree_leaf" value="100"/>
                <boolean name="direct_visualization" value="false"/>
                <integer name="spp" value="8"/>
            </integrator>
            <float name="ior" value="1.0"/>
            <sensor type="perspective">
                <float name="fov" value="45.0"/>
                <transform name="to_world">
                    <lookat origin="0, 1, 4" target="0, 1, 0" up="0, 1, 0"/>
                </transform>
                <film>
                    <integer name="width" value="64"/>
                    <integer name="height" value="48"/>
                </film>
            </sensor>
            <bsdf type="diffuse" id="white">
                <rgb name="reflectance" value="0.75 0.75 0.75"/>
            </bsdf>
            <bsdf type="dielectric" id="glass">
                <float name="int_ior" value="1.5"/>
            </bsdf>
            <shape type="rectangle">
                <point name="origin" value="-1, 0, -1"/>
                <vector name="edge_u" value="0, 0, 2"/>
                <vector name="edge_v" value="2, 0, 0"/>
                <ref id="white"/>
            </shape>
            <shape type="sphere">
                <point name="center" value="0, 0.5, 0"/>
                <float name="radius" value="0.5"/>
                <ref id="glass"/>
            </shape>
            <shape type="rectangle">
                <point name="origin" value="-0.25, 1.99, -0.25"/>
                <vector name="edge_u" value="0.5, 0, 0"/>
                <vector name="edge_v" value="0, 0, 0.5"/>
                <bsdf type="diffuse">
                    <rgb name="reflectance" value="0 0 0"/>
                </bsdf>
                <emitter type="area">
                    <rgb name="radiance" value="20 20 20"/>
                </emitter>
            </shape>
        </scene>
    "#;

    #[test]
    fn test_parse_cornell() {
        let result = parse_scene(CORNELL).expect("scene should parse");
        assert_eq!(result.scene.len(), 3);
        assert_eq!(result.scene.emissive_indices(), vec![2]);
        assert!(result.scene.camera(0).is_some());
        assert_eq!(result.integrator_type.as_deref(), Some("photon_mapper"));
        assert_eq!(result.samples_per_pixel, Some(8));

        let settings = result.photon_map_settings.expect("photon map settings");
        assert_eq!(settings.emissions, 100000);
        assert!((settings.caustic_factor - 4.0).abs() < 1e-6);
        assert_eq!(settings.k_nearest_photons, 64);
        assert_eq!(settings.max_photons_per_octree_leaf, 100);
        assert!(!settings.direct_visualization);
    }

    #[test]
    fn test_reject_caustic_factor_below_one() {
        let xml = r#"
            <scene>
                <integrator type="photon_mapper">
                    <integer name="emissions" value="1000"/>
                    <float name="caustic_factor" value="0.5"/>
                </integrator>
            </scene>
        "#;
        assert!(matches!(parse_scene(xml), Err(SceneLoadError::Parse(_))));
    }

    #[test]
    fn test_reject_missing_emissions() {
        let xml = r#"
            <scene>
                <integrator type="photon_mapper">
                    <float name="caustic_factor" value="2.0"/>
                </integrator>
            </scene>
        "#;
        assert!(matches!(parse_scene(xml),
                         Err(SceneLoadError::MissingField("emissions"))));
    }

    #[test]
    fn test_reject_unknown_bsdf_reference() {
        let xml = r#"
            <scene>
                <shape type="sphere">
                    <point name="center" value="0, 0, 0"/>
                    <float name="radius" value="1"/>
                    <ref id="nonexistent"/>
                </shape>
            </scene>
        "#;
        assert!(matches!(parse_scene(xml), Err(SceneLoadError::Parse(_))));
    }

    #[test]
    fn test_parse_path_integrator() {
        let xml = r#"
            <scene>
                <integrator type="path">
                    <integer name="max_depth" value="8"/>
                    <integer name="spp" value="16"/>
                </integrator>
            </scene>
        "#;
        let result = parse_scene(xml).expect("scene should parse");
        assert_eq!(result.integrator_type.as_deref(), Some("path"));
        assert_eq!(result.max_depth, Some(8));
        assert_eq!(result.samples_per_pixel, Some(16));
        assert!(result.photon_map_settings.is_none());
    }

    #[test]
    fn test_scene_emission_parsed() {
        let result = parse_scene(CORNELL).expect("scene should parse");
        let light = &result.scene.objects()[2];
        assert!(!light.emission.is_black());
        assert!((light.emission[0] - 20.0).abs() < 1e-6);
    }
}
