//! End-to-end scenarios for the measurement driver.

use approx::assert_relative_eq;
use rm_geometry::Connectivity;
use rm_image::{Image, PhysicalQuantity, PixelSize, Units};

use crate::error::MeasureError;
use crate::feature::{
    CompositeFeature, DependencyValues, FeatureInfo, FeatureKind, ValueInformation,
};
use crate::MeasurementTool;

fn square3_label(metres: bool) -> Image {
    let mut data = vec![0u8; 25];
    for y in 1..4 {
        for x in 1..4 {
            data[y * 5 + x] = 1;
        }
    }
    let img = Image::from_u8(vec![5, 5], data).unwrap();
    if metres {
        img.with_pixel_size(PixelSize::isotropic(2, PhysicalQuantity::metres(1.0)))
    } else {
        img
    }
}

const SQUARE3_PERIMETER: f64 = 0.980 * 8.0 - 0.091 * 4.0 + std::f64::consts::PI;

#[test]
fn test_square_size_perimeter_feret_p2a() {
    let label = square3_label(true);
    let tool = MeasurementTool::new();
    let m = tool
        .measure(
            &label,
            None,
            &["Size", "Perimeter", "Feret", "P2A"],
            &[],
            Connectivity::Eight,
        )
        .unwrap();
    assert_eq!(m.objects(), &[1]);
    let names: Vec<&str> = m.features().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Size", "Perimeter", "Feret", "P2A"]);

    let row = m.row(1).unwrap();
    assert_relative_eq!(row["Size"][0], 9.0);
    assert_eq!(m.values_of("Size").unwrap()[0].units, Units::metre().pow(2));
    assert_relative_eq!(row["Perimeter"][0], SQUARE3_PERIMETER, epsilon = 1e-12);
    let feret = &row["Feret"];
    assert_relative_eq!(feret[0], 2.0 * 2f64.sqrt(), epsilon = 1e-2);
    assert_relative_eq!(feret[1], 2.0, epsilon = 1e-3);
    assert_relative_eq!(feret[2], 2.0, epsilon = 1e-3);
    let expected_p2a =
        SQUARE3_PERIMETER * SQUARE3_PERIMETER / (4.0 * std::f64::consts::PI * 9.0);
    assert_relative_eq!(row["P2A"][0], expected_p2a, epsilon = 1e-12);
}

#[test]
fn test_p2a_invariant_under_calibration() {
    // P²/(4πA) is dimensionless: the calibrated and uncalibrated results
    // must agree, which requires the scale pass to run before composites.
    let tool = MeasurementTool::new();
    let calibrated = square3_label(false).with_pixel_size(PixelSize::isotropic(
        2,
        PhysicalQuantity::micrometres(0.5),
    ));
    let a = tool
        .measure(&calibrated, None, &["P2A"], &[], Connectivity::Eight)
        .unwrap();
    let b = tool
        .measure(
            &square3_label(false),
            None,
            &["P2A"],
            &[],
            Connectivity::Eight,
        )
        .unwrap();
    assert_relative_eq!(
        a.row(1).unwrap()["P2A"][0],
        b.row(1).unwrap()["P2A"][0],
        epsilon = 1e-12
    );
}

#[test]
fn test_single_pixel_object() {
    let label = Image::from_u8(vec![3, 3], vec![0, 0, 0, 0, 1, 0, 0, 0, 0]).unwrap();
    let tool = MeasurementTool::new();
    let m = tool
        .measure(
            &label,
            None,
            &["Size", "Perimeter", "Feret", "SolidArea"],
            &[],
            Connectivity::Eight,
        )
        .unwrap();
    let row = m.row(1).unwrap();
    assert_relative_eq!(row["Size"][0], 1.0);
    assert_eq!(
        m.values_of("Size").unwrap()[0].units,
        Units::pixel().pow(2)
    );
    assert_relative_eq!(row["Perimeter"][0], std::f64::consts::PI, epsilon = 1e-12);
    assert_relative_eq!(row["Feret"][0], 1.0);
    assert_relative_eq!(row["Feret"][1], 1.0);
    assert_relative_eq!(row["Feret"][2], 1.0);
    // The edge-midpoint diamond of a single pixel.
    assert_relative_eq!(row["SolidArea"][0], 0.5, epsilon = 1e-12);
}

#[test]
fn test_caller_object_order_preserved() {
    // Object 1 is a 2x2 block, object 2 a 3x3 block.
    let mut data = vec![0u8; 36];
    for y in 0..2 {
        for x in 0..2 {
            data[y * 6 + x] = 1;
        }
    }
    for y in 3..6 {
        for x in 3..6 {
            data[y * 6 + x] = 2;
        }
    }
    let label = Image::from_u8(vec![6, 6], data).unwrap();
    let tool = MeasurementTool::new();
    let m = tool
        .measure(&label, None, &["Size"], &[2, 1], Connectivity::Eight)
        .unwrap();
    assert_eq!(m.objects(), &[2, 1]);
    let col = m.column("Size").unwrap();
    assert_eq!(&col[2], &[9.0]);
    assert_eq!(&col[1], &[4.0]);

    // Duplicates collapse onto their first occurrence.
    let m = tool
        .measure(&label, None, &["Size"], &[2, 1, 2], Connectivity::Eight)
        .unwrap();
    assert_eq!(m.objects(), &[2, 1]);
}

#[test]
fn test_composite_dependencies_auto_added_in_order() {
    let label = square3_label(false);
    let tool = MeasurementTool::new();
    let m = tool
        .measure(&label, None, &["Convexity"], &[], Connectivity::Eight)
        .unwrap();
    let names: Vec<&str> = m.features().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Convexity", "Size", "ConvexArea"]);
    let v = m.row(1).unwrap()["Convexity"][0];
    assert!((0.0..=1.0).contains(&v), "Convexity out of range: {v}");
}

#[test]
fn test_collinear_strip_degenerates_gracefully() {
    // A 1x5 strip: hull-based features emit NaN, the chain-code features
    // still succeed.
    let mut data = vec![0u8; 21];
    for x in 1..6 {
        data[7 + x] = 1;
    }
    let label = Image::from_u8(vec![3, 7], data).unwrap();
    let tool = MeasurementTool::new();
    let m = tool
        .measure(
            &label,
            None,
            &["Size", "Perimeter", "Feret", "ConvexArea", "Convexity"],
            &[],
            Connectivity::Eight,
        )
        .unwrap();
    let row = m.row(1).unwrap();
    assert_relative_eq!(row["Size"][0], 5.0);
    assert!(row["Perimeter"][0].is_finite());
    assert_relative_eq!(row["Feret"][0], 4.0, epsilon = 1e-3);
    assert_relative_eq!(row["Feret"][1], 1.0); // small-object floor
    assert!(row["ConvexArea"][0].is_nan());
    assert!(row["Convexity"][0].is_nan());
}

#[test]
fn test_empty_label_image() {
    let label = Image::from_u8(vec![4, 4], vec![0; 16]).unwrap();
    let tool = MeasurementTool::new();
    let m = tool
        .measure(&label, None, &["Size"], &[], Connectivity::Eight)
        .unwrap();
    assert_eq!(m.number_of_objects(), 0);
    assert_eq!(m.data().len(), 0);
    assert_eq!(m.rows().count(), 0);
    // Formatting an empty result must not panic.
    let _ = m.to_string();
}

#[test]
fn test_validation_errors() {
    let tool = MeasurementTool::new();
    let label = square3_label(false);

    let float_label = Image::from_f32(vec![2, 2], vec![0.0; 4]).unwrap();
    assert!(matches!(
        tool.measure(&float_label, None, &["Size"], &[], Connectivity::Eight),
        Err(MeasureError::InvalidInput(_))
    ));

    assert!(matches!(
        tool.measure(&label, None, &[], &[], Connectivity::Eight),
        Err(MeasureError::InvalidInput(_))
    ));

    assert!(matches!(
        tool.measure(&label, None, &["NoSuchFeature"], &[], Connectivity::Eight),
        Err(MeasureError::UnknownFeature(_))
    ));

    assert!(matches!(
        tool.measure(&label, None, &["Mean"], &[], Connectivity::Eight),
        Err(MeasureError::GreyRequired(_))
    ));

    let small_grey = Image::from_f32(vec![2, 2], vec![0.0; 4]).unwrap();
    assert!(matches!(
        tool.measure(
            &label,
            Some(&small_grey),
            &["Mean"],
            &[],
            Connectivity::Eight
        ),
        Err(MeasureError::InvalidInput(_))
    ));

    let int_grey = Image::from_u8(vec![5, 5], vec![0; 25]).unwrap();
    assert!(matches!(
        tool.measure(&label, Some(&int_grey), &["Mean"], &[], Connectivity::Eight),
        Err(MeasureError::InvalidInput(_))
    ));
}

#[test]
fn test_intensity_features() {
    let label = Image::from_u8(vec![2, 3], vec![1, 1, 1, 1, 1, 1]).unwrap();
    let grey = Image::from_f32(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let tool = MeasurementTool::new();
    let m = tool
        .measure(
            &label,
            Some(&grey),
            &[
                "Mass",
                "Mean",
                "StandardDeviation",
                "Statistics",
                "MaxVal",
                "MinVal",
                "MaxPos",
                "MinPos",
            ],
            &[],
            Connectivity::Eight,
        )
        .unwrap();
    let row = m.row(1).unwrap();
    assert_relative_eq!(row["Mass"][0], 21.0);
    assert_relative_eq!(row["Mean"][0], 3.5);
    assert_relative_eq!(row["StandardDeviation"][0], 3.5f64.sqrt(), epsilon = 1e-12);
    assert_relative_eq!(row["Statistics"][0], 3.5);
    // MaxVal is a maximum, not a sum.
    assert_relative_eq!(row["MaxVal"][0], 6.0);
    assert_relative_eq!(row["MinVal"][0], 1.0);
    // The largest value sits at x=2, y=1.
    assert_eq!(&row["MaxPos"], &[2.0, 1.0]);
    assert_eq!(&row["MinPos"], &[0.0, 0.0]);
}

#[test]
fn test_half_precision_grey() {
    let label = Image::from_u8(vec![1, 3], vec![1, 1, 1]).unwrap();
    let grey = Image::from_f16(
        vec![1, 3],
        [1.0f32, 2.0, 3.0]
            .iter()
            .map(|&v| half::f16::from_f32(v))
            .collect(),
    )
    .unwrap();
    let tool = MeasurementTool::new();
    let m = tool
        .measure(&label, Some(&grey), &["Mean"], &[], Connectivity::Eight)
        .unwrap();
    assert_relative_eq!(m.row(1).unwrap()["Mean"][0], 2.0);
}

#[test]
fn test_moment_features_on_box() {
    // A full 4x2 image: width 4 along x, height 2 along y.
    let label = Image::from_u8(vec![2, 4], vec![1; 8]).unwrap();
    let tool = MeasurementTool::new();
    let m = tool
        .measure(
            &label,
            None,
            &["Center", "Mu", "Inertia", "DimensionsCube", "DimensionsEllipsoid"],
            &[],
            Connectivity::Eight,
        )
        .unwrap();
    let row = m.row(1).unwrap();
    assert_eq!(&row["Center"], &[1.5, 0.5]);
    // Inertia-form tensor of the discrete box: [μyy, μxx, −μxy].
    assert_relative_eq!(row["Mu"][0], 0.25, epsilon = 1e-12);
    assert_relative_eq!(row["Mu"][1], 1.25, epsilon = 1e-12);
    assert_relative_eq!(row["Mu"][2], 0.0, epsilon = 1e-12);
    assert_relative_eq!(row["Inertia"][0], 1.25, epsilon = 1e-12);
    assert_relative_eq!(row["Inertia"][1], 0.25, epsilon = 1e-12);
    assert_relative_eq!(row["DimensionsCube"][0], 15f64.sqrt(), epsilon = 1e-12);
    assert_relative_eq!(row["DimensionsCube"][1], 3f64.sqrt(), epsilon = 1e-12);
    assert_relative_eq!(row["DimensionsEllipsoid"][0], 20f64.sqrt(), epsilon = 1e-12);
}

#[test]
fn test_composite_chain_resolves_through_toposort() {
    // DimensionsCube depends on Inertia which depends on Mu; requesting only
    // the outermost feature must pull in and evaluate the whole chain.
    let label = Image::from_u8(vec![2, 4], vec![1; 8]).unwrap();
    let tool = MeasurementTool::new();
    let m = tool
        .measure(&label, None, &["DimensionsCube"], &[], Connectivity::Eight)
        .unwrap();
    let names: Vec<&str> = m.features().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["DimensionsCube", "Inertia", "Mu"]);
    assert_relative_eq!(
        m.row(1).unwrap()["DimensionsCube"][0],
        15f64.sqrt(),
        epsilon = 1e-12
    );
}

#[test]
fn test_grey_moments() {
    // All weight on the right column pulls the gravity centre to x=2.
    let label = Image::from_u8(vec![2, 3], vec![1; 6]).unwrap();
    let grey = Image::from_f64(vec![2, 3], vec![0.0, 0.0, 2.0, 0.0, 0.0, 2.0]).unwrap();
    let tool = MeasurementTool::new();
    let m = tool
        .measure(
            &label,
            Some(&grey),
            &["Gravity", "GreyInertia"],
            &[],
            Connectivity::Eight,
        )
        .unwrap();
    let row = m.row(1).unwrap();
    assert_eq!(&row["Gravity"], &[2.0, 0.5]);
    assert!(row["GreyInertia"][0].is_finite());
}

#[test]
fn test_subset_measurement_skips_other_labels() {
    let label = Image::from_u8(vec![1, 4], vec![1, 1, 2, 2]).unwrap();
    let tool = MeasurementTool::new();
    let m = tool
        .measure(&label, None, &["Size"], &[2], Connectivity::Eight)
        .unwrap();
    assert_eq!(m.objects(), &[2]);
    assert_relative_eq!(m.row(2).unwrap()["Size"][0], 2.0);
    assert!(!m.object_exists(1));
}

#[test]
fn test_anisotropic_scaling() {
    let label = square3_label(false).with_pixel_size(PixelSize::anisotropic(vec![
        PhysicalQuantity::metres(1.0), // y pitch
        PhysicalQuantity::metres(2.0), // x pitch
    ]));
    let tool = MeasurementTool::new();
    let m = tool
        .measure(
            &label,
            None,
            &["Size", "Perimeter", "Center"],
            &[],
            Connectivity::Eight,
        )
        .unwrap();
    let row = m.row(1).unwrap();
    assert_relative_eq!(row["Size"][0], 18.0);
    assert_eq!(m.values_of("Size").unwrap()[0].units, Units::metre().pow(2));
    // Boundary features stay in pixels for anisotropic images.
    assert_eq!(m.values_of("Perimeter").unwrap()[0].units, Units::pixel());
    assert_relative_eq!(row["Perimeter"][0], SQUARE3_PERIMETER, epsilon = 1e-12);
    // Centre scales per axis: x pitch 2, y pitch 1.
    assert_eq!(&row["Center"], &[4.0, 2.0]);
}

#[test]
fn test_surface_area_on_3d_cube() {
    let mut data = vec![0u8; 64];
    for z in 1..3 {
        for y in 1..3 {
            for x in 1..3 {
                data[z * 16 + y * 4 + x] = 1;
            }
        }
    }
    let label = Image::from_u8(vec![4, 4, 4], data).unwrap();
    let tool = MeasurementTool::new();
    let m = tool
        .measure(
            &label,
            None,
            &["Size", "SurfaceArea", "P2A"],
            &[],
            Connectivity::Eight,
        )
        .unwrap();
    let row = m.row(1).unwrap();
    assert_relative_eq!(row["Size"][0], 8.0);
    let s = row["SurfaceArea"][0];
    assert!(s > 0.0);
    let expected_p2a = s.powf(1.5) / (6.0 * std::f64::consts::PI.sqrt() * 8.0);
    assert_relative_eq!(row["P2A"][0], expected_p2a, epsilon = 1e-12);
}

#[test]
fn test_2d_feature_on_3d_image_is_invalid_input() {
    let label = Image::from_u8(vec![2, 2, 2], vec![1; 8]).unwrap();
    let tool = MeasurementTool::new();
    assert!(matches!(
        tool.measure(&label, None, &["Perimeter"], &[], Connectivity::Eight),
        Err(MeasureError::InvalidInput(_))
    ));
}

struct CyclicComposite {
    name: &'static str,
    dependency: &'static str,
}

impl FeatureInfo for CyclicComposite {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "test composite"
    }

    fn initialize(
        &mut self,
        _label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> crate::Result<Vec<ValueInformation>> {
        Ok(vec![ValueInformation::new("", Units::none())])
    }
}

impl CompositeFeature for CyclicComposite {
    fn dependencies(&self) -> Vec<String> {
        vec![self.dependency.to_string()]
    }

    fn compose(&mut self, _dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        output[0] = 0.0;
    }
}

#[test]
fn test_cyclic_composites_are_a_configuration_error() {
    let label = square3_label(false);
    let mut tool = MeasurementTool::new();
    tool.register(|| {
        FeatureKind::Composite(Box::new(CyclicComposite {
            name: "CycleA",
            dependency: "CycleB",
        }))
    });
    tool.register(|| {
        FeatureKind::Composite(Box::new(CyclicComposite {
            name: "CycleB",
            dependency: "CycleA",
        }))
    });
    assert!(matches!(
        tool.measure(&label, None, &["CycleA"], &[], Connectivity::Eight),
        Err(MeasureError::Configuration(_))
    ));
}

#[test]
fn test_shape_composites() {
    let label = square3_label(false);
    let tool = MeasurementTool::new();
    let m = tool
        .measure(
            &label,
            None,
            &[
                "AspectRatioFeret",
                "Roundness",
                "Circularity",
                "PodczeckShapes",
                "Radius",
                "BendingEnergy",
                "EllipseVariance",
            ],
            &[],
            Connectivity::Eight,
        )
        .unwrap();
    let row = m.row(1).unwrap();
    assert_relative_eq!(row["AspectRatioFeret"][0], 2f64.sqrt(), epsilon = 1e-2);
    let roundness = row["Roundness"][0];
    assert!((0.0..=1.0).contains(&roundness));
    assert!(row["Circularity"][0] >= 0.0);
    // Podczeck's square measure compares the area to the Feret box.
    assert_relative_eq!(row["PodczeckShapes"][0], 9.0 / 4.0, epsilon = 1e-2);
    assert_relative_eq!(row["PodczeckShapes"][4], 2f64.sqrt(), epsilon = 1e-2);
    // Boundary pixels of the square lie on a ring around the centroid.
    assert_relative_eq!(row["Radius"][1], (1.0 + 2f64.sqrt()) / 2.0, epsilon = 1e-12);
    assert!(row["BendingEnergy"][0] > 0.0);
    assert!(row["EllipseVariance"][0] >= 0.0);
}

#[test]
fn test_object_to_measurement_round_trip() {
    let label = Image::from_u8(vec![1, 4], vec![1, 0, 2, 2]).unwrap();
    let tool = MeasurementTool::new();
    let m = tool
        .measure(&label, None, &["Size"], &[], Connectivity::Eight)
        .unwrap();
    let img = crate::object_to_measurement(&label, &m.column("Size").unwrap()).unwrap();
    assert_eq!(img.at(&[0, 0]).unwrap(), 1.0);
    assert_eq!(img.at(&[0, 1]).unwrap(), 0.0);
    assert_eq!(img.at(&[0, 2]).unwrap(), 2.0);
}
