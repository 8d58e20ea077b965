use std::collections::{HashMap, VecDeque};

use log::{debug, trace};
use rm_geometry::{get_image_chain_codes, Connectivity, Polygon};
use rm_image::{get_object_labels, scan_lines, Image};

use crate::error::{MeasureError, Result};
use crate::feature::{DependencyValues, FeatureKind, ObjectIdToIndexMap};
use crate::features::register_defaults;
use crate::measurement::Measurement;
use crate::registry::FeatureRegistry;

/// The measurement engine: a feature registry plus the planner/driver that
/// turns a feature request into a forged result matrix.
pub struct MeasurementTool {
    registry: FeatureRegistry,
}

impl Default for MeasurementTool {
    fn default() -> Self {
        MeasurementTool::new()
    }
}

impl MeasurementTool {
    /// An engine populated with the built-in feature catalogue.
    pub fn new() -> MeasurementTool {
        let mut registry = FeatureRegistry::new();
        register_defaults(&mut registry);
        MeasurementTool { registry }
    }

    /// Register an additional feature factory.
    pub fn register<F>(&mut self, factory: F)
    where
        F: Fn() -> FeatureKind + Send + Sync + 'static,
    {
        self.registry.register(factory);
    }

    pub fn known(&self, name: &str) -> bool {
        self.registry.known(name)
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    /// Measure the requested features for the requested objects.
    ///
    /// When `object_ids` is empty all labels present in the image are
    /// measured in ascending order; otherwise the caller's order is kept
    /// with duplicates collapsed onto their first occurrence. Validation,
    /// lookup, and initialization errors abort the call with no partial
    /// result; numeric degeneracies inside feature evaluation surface as
    /// NaN cells.
    pub fn measure(
        &self,
        label: &Image,
        grey: Option<&Image>,
        features: &[&str],
        object_ids: &[u32],
        connectivity: Connectivity,
    ) -> Result<Measurement> {
        // Input validation.
        if !label.is_scalar() {
            return Err(MeasureError::InvalidInput(
                "label image must be scalar".to_string(),
            ));
        }
        if !label.data_type().is_unsigned_int() {
            return Err(MeasureError::InvalidInput(format!(
                "label image must be of an unsigned integer type, got {}",
                label.data_type()
            )));
        }
        if features.is_empty() {
            return Err(MeasureError::InvalidInput(
                "no features requested".to_string(),
            ));
        }
        if let Some(grey) = grey {
            if grey.sizes() != label.sizes() {
                return Err(MeasureError::InvalidInput(format!(
                    "grey image sizes {:?} do not match label sizes {:?}",
                    grey.sizes(),
                    label.sizes()
                )));
            }
            if !grey.data_type().is_real() {
                return Err(MeasureError::InvalidInput(format!(
                    "grey image must be of a real type, got {}",
                    grey.data_type()
                )));
            }
        }

        // Object enumeration.
        let mut measurement = Measurement::new();
        if object_ids.is_empty() {
            measurement.set_object_ids(&get_object_labels(label, true)?)?;
        } else {
            measurement.set_object_ids(object_ids)?;
        }
        let objects = measurement.objects().to_vec();
        let index_map: ObjectIdToIndexMap =
            objects.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        debug!(
            "measuring {} features over {} objects",
            features.len(),
            objects.len()
        );

        // Feature-graph closure.
        let mut plan: Vec<(String, FeatureKind)> = Vec::new();
        let mut queue: VecDeque<String> =
            features.iter().map(|&f| f.to_string()).collect();
        while let Some(name) = queue.pop_front() {
            if measurement.feature_exists(&name) {
                continue;
            }
            let mut feature = self
                .registry
                .lookup(&name)
                .ok_or_else(|| MeasureError::UnknownFeature(name.clone()))?;
            if feature.info().needs_grey() && grey.is_none() {
                return Err(MeasureError::GreyRequired(name.clone()));
            }
            let values = feature
                .info_mut()
                .initialize(label, grey, objects.len())?;
            measurement.add_feature(name.clone(), values)?;
            if let FeatureKind::Composite(c) = &feature {
                for dep in c.dependencies() {
                    trace!("feature {name} pulls in dependency {dep}");
                    queue.push_back(dep);
                }
            }
            plan.push((name, feature));
        }
        let composite_order = composite_evaluation_order(&plan)?;

        // Forge the result matrix.
        measurement.forge()?;
        let n_objects = objects.len();

        // Line-based pass: a single raster scan.
        if plan.iter().any(|(_, k)| matches!(k, FeatureKind::Line(_))) {
            trace!("line-based pass");
            scan_lines(label, grey, |line| {
                for (_, kind) in plan.iter_mut() {
                    if let FeatureKind::Line(f) = kind {
                        f.scan_line(line, &index_map);
                    }
                }
            })?;
            for (idx, (_, kind)) in plan.iter_mut().enumerate() {
                if let FeatureKind::Line(f) = kind {
                    for row in 0..n_objects {
                        f.finish(row, measurement.span_mut(row, idx));
                    }
                }
            }
        }

        // Image-based pass.
        for (idx, (name, kind)) in plan.iter_mut().enumerate() {
            if let FeatureKind::Image(f) = kind {
                trace!("image-based pass: {name}");
                let k = measurement
                    .number_of_values_of(name)
                    .expect("declared above");
                let mut scratch = vec![f64::NAN; n_objects * k];
                f.measure(label, grey, &objects, &mut scratch);
                for row in 0..n_objects {
                    measurement
                        .span_mut(row, idx)
                        .copy_from_slice(&scratch[row * k..(row + 1) * k]);
                }
            }
        }

        // Chain-code / polygon / convex-hull pass.
        if plan.iter().any(|(_, k)| k.is_geometric()) {
            trace!("geometric pass");
            let needs_polygon = plan
                .iter()
                .any(|(_, k)| matches!(k, FeatureKind::Polygon(_)));
            let needs_hull = plan
                .iter()
                .any(|(_, k)| matches!(k, FeatureKind::ConvexHull(_)));
            let chains = get_image_chain_codes(label, &objects, connectivity)?;
            for (row, chain) in chains.iter().enumerate() {
                let Some(chain) = chain else {
                    // Objects without pixels keep their NaN cells.
                    continue;
                };
                let polygon = if needs_polygon {
                    chain.polygon().ok()
                } else {
                    None
                };
                let hull = if needs_hull {
                    Polygon::new(chain.vertices()).convex_hull().ok()
                } else {
                    None
                };
                for (idx, (_, kind)) in plan.iter_mut().enumerate() {
                    match kind {
                        FeatureKind::ChainCode(f) => {
                            f.measure(chain, measurement.span_mut(row, idx));
                        }
                        FeatureKind::Polygon(f) => {
                            if let Some(polygon) = &polygon {
                                f.measure(polygon, measurement.span_mut(row, idx));
                            }
                        }
                        FeatureKind::ConvexHull(f) => {
                            if let Some(hull) = &hull {
                                f.measure(hull, measurement.span_mut(row, idx));
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        // Scale pass. This runs before the composite pass so composites
        // read calibrated values (the other kinds scale inside `measure`).
        for (idx, (_, kind)) in plan.iter().enumerate() {
            if let FeatureKind::Line(f) = kind {
                if let Some(multipliers) = f.scale_values() {
                    for row in 0..n_objects {
                        for (v, m) in measurement
                            .span_mut(row, idx)
                            .iter_mut()
                            .zip(&multipliers)
                        {
                            *v *= m;
                        }
                    }
                }
            }
        }

        // Composite pass, dependencies before dependants.
        if !composite_order.is_empty() {
            trace!("composite pass");
            let spans = measurement.spans();
            for idx in composite_order {
                let FeatureKind::Composite(c) = &mut plan[idx].1 else {
                    unreachable!("composite order only indexes composites");
                };
                for row in 0..n_objects {
                    let snapshot = measurement.row_slice(row).to_vec();
                    let deps = DependencyValues::new(&snapshot, &spans);
                    c.compose(&deps, measurement.span_mut(row, idx));
                }
            }
        }

        // Release per-object scratch.
        for (_, kind) in plan.iter_mut() {
            kind.info_mut().cleanup();
        }
        Ok(measurement)
    }
}

/// Evaluation order of the composite features: dependencies first.
///
/// Only composite-to-composite edges constrain the order; a dependency
/// cycle is a configuration error.
fn composite_evaluation_order(plan: &[(String, FeatureKind)]) -> Result<Vec<usize>> {
    let composite_index: HashMap<&str, usize> = plan
        .iter()
        .enumerate()
        .filter(|(_, (_, k))| matches!(k, FeatureKind::Composite(_)))
        .map(|(idx, (name, _))| (name.as_str(), idx))
        .collect();
    let mut dependants: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut in_degree: HashMap<usize, usize> = HashMap::new();
    for (&_, &idx) in &composite_index {
        in_degree.entry(idx).or_insert(0);
    }
    for (idx, (_, kind)) in plan.iter().enumerate() {
        if let FeatureKind::Composite(c) = kind {
            for dep in c.dependencies() {
                if let Some(&dep_idx) = composite_index.get(dep.as_str()) {
                    dependants.entry(dep_idx).or_default().push(idx);
                    *in_degree.entry(idx).or_insert(0) += 1;
                }
            }
        }
    }
    let mut ready: VecDeque<usize> = {
        let mut zero: Vec<usize> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&i, _)| i)
            .collect();
        // Declaration order among unconstrained composites.
        zero.sort_unstable();
        zero.into_iter().collect()
    };
    let mut order = Vec::with_capacity(in_degree.len());
    while let Some(idx) = ready.pop_front() {
        order.push(idx);
        for &next in dependants.get(&idx).into_iter().flatten() {
            let d = in_degree.get_mut(&next).expect("tracked above");
            *d -= 1;
            if *d == 0 {
                ready.push_back(next);
            }
        }
    }
    if order.len() != in_degree.len() {
        return Err(MeasureError::Configuration(
            "cyclic composite feature dependencies".to_string(),
        ));
    }
    Ok(order)
}
