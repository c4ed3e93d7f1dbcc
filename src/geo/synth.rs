/// Command synthesis: six correspondences → ordered rectification operations
///
/// Pure function of its inputs; the same correspondences and config always
/// yield the same operation list.
use super::operation::{Artifact, ControlPoint, Crs, GcpTarget, Operation};
use crate::state::data::CapturedPoints;
use crate::state::options::BatchConfig;

/// Build the operation sequence that rectifies one image.
///
/// Order:
/// 1. six `ReprojectPoint` when preprojecting
/// 2. `AssignControlPoints` (GCPs in the conic CRS or the input datum)
/// 3. `Rectify`, also reprojecting to the conic space unless preprojected
/// 4. `Cleanup` of the GCP-tagged copy
/// 5. `ReprojectRaster` + `Cleanup` of the conic raster, or `Finalize`
pub fn synthesize(points: &CapturedPoints, config: &BatchConfig) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(12);
    let geographic = Crs::Geographic(config.input_datum);

    let mut gcps = Vec::with_capacity(points.points().len());
    for point in points.points() {
        let coord = config.targets.get(point.label);
        let target = if config.preproject {
            ops.push(Operation::ReprojectPoint {
                label: point.label,
                lon: coord.lon.clone(),
                lat: coord.lat.clone(),
                from: geographic.clone(),
                to: Crs::Conic,
            });
            GcpTarget::Preprojected(point.label)
        } else {
            GcpTarget::Geographic {
                lon: coord.lon.clone(),
                lat: coord.lat.clone(),
            }
        };

        gcps.push(ControlPoint {
            label: point.label,
            pixel_x: point.x,
            pixel_y: point.y,
            target,
        });
    }

    let (gcp_srs, reproject_to) = if config.preproject {
        (Crs::Conic, None)
    } else {
        (geographic, Some(Crs::Conic))
    };

    ops.push(Operation::AssignControlPoints { gcps, srs: gcp_srs });
    ops.push(Operation::Rectify {
        warp: config.warp.clone(),
        reproject_to,
    });
    ops.push(Operation::Cleanup(Artifact::ControlPointTagged));

    match &config.target_crs {
        Some(target) => {
            ops.push(Operation::ReprojectRaster {
                resampling: config.warp.resampling,
                target: Crs::Target(target.clone()),
            });
            ops.push(Operation::Cleanup(Artifact::Conic));
        }
        None => ops.push(Operation::Finalize),
    }

    ops
}
