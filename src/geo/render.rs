/// Render synthesized operations as a bash block for the GDAL CLI tools
///
/// Each block re-declares its own variables so blocks can be replayed on
/// their own or concatenated. The script header turns on `set -euo pipefail`
/// so the first failing command aborts the run.
use super::operation::{Artifact, Crs, GcpTarget, Operation, WarpSettings};
use crate::state::options::BatchConfig;

/// Written once, when the script file does not exist yet
pub const SCRIPT_HEADER: &str = "#!/bin/bash\nset -euo pipefail\nmkdir -p georeferenced\n\n";

/// Output directory created by the header
pub const OUTPUT_DIR: &str = "georeferenced";

/// Quote a value for bash: wrap in single quotes, escape embedded ones
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Render one image's block, terminated by a blank line
pub fn render_block(file_name: &str, config: &BatchConfig, ops: &[Operation]) -> String {
    let mut lines = vec![
        format!("src={}", shell_quote(file_name)),
        format!("tmp={}", shell_quote(&format!("{OUTPUT_DIR}/temp_{file_name}"))),
        format!("lcc={}", shell_quote(&format!("{OUTPUT_DIR}/lcc_{file_name}"))),
        format!("out={}", shell_quote(&format!("{OUTPUT_DIR}/{file_name}"))),
        "echo \"Processing $src...\"".to_string(),
        format!("LCC_PROJ=\"{}\"", config.projection_string()),
        format!("GEO_SRS=\"{}\"", config.input_datum.epsg()),
        String::new(),
    ];

    lines.extend(ops.iter().map(|op| render_operation(op, config)));

    let mut block = lines.join("\n");
    block.push_str("\n\n");
    block
}

fn render_crs(crs: &Crs, config: &BatchConfig) -> String {
    match crs {
        Crs::Geographic(datum) if *datum == config.input_datum => "\"$GEO_SRS\"".to_string(),
        Crs::Geographic(datum) => format!("\"{}\"", datum.epsg()),
        Crs::Conic => "\"$LCC_PROJ\"".to_string(),
        Crs::Target(target) => target.as_str().to_string(),
    }
}

fn artifact_var(artifact: Artifact) -> &'static str {
    match artifact {
        Artifact::ControlPointTagged => "\"$tmp\"",
        Artifact::Conic => "\"$lcc\"",
    }
}

fn warp_flags(warp: &WarpSettings) -> String {
    let mut flags = format!("-r {}", warp.resampling);
    match warp.model.degree() {
        Some(degree) => flags.push_str(&format!(" -order {degree}")),
        None => flags.push_str(" -tps"),
    }
    if let Some(refine) = &warp.refinement {
        flags.push_str(&format!(" -refine_gcps {} {}", refine.tolerance, refine.min_gcps));
    }
    flags
}

fn render_operation(op: &Operation, config: &BatchConfig) -> String {
    match op {
        Operation::ReprojectPoint { label, lon, lat, from, to } => {
            let n = label.number();
            format!(
                "read X{n} Y{n} _ <<< $(echo \"{lon} {lat}\" | gdaltransform -s_srs {} -t_srs {})",
                render_crs(from, config),
                render_crs(to, config),
            )
        }
        Operation::AssignControlPoints { gcps, srs } => {
            let gcp_args: Vec<String> = gcps
                .iter()
                .map(|gcp| {
                    let (px, py) = gcp.pixel_text();
                    let (gx, gy) = match &gcp.target {
                        GcpTarget::Geographic { lon, lat } => (lon.clone(), lat.clone()),
                        GcpTarget::Preprojected(label) => {
                            let n = label.number();
                            (format!("${{X{n}}}"), format!("${{Y{n}}}"))
                        }
                    };
                    format!("-gcp {px} {py} {gx} {gy}")
                })
                .collect();
            format!(
                "gdal_translate -of GTiff -a_srs {} {} \"$src\" \"$tmp\"",
                render_crs(srs, config),
                gcp_args.join(" "),
            )
        }
        Operation::Rectify { warp, reproject_to } => {
            let t_srs = reproject_to
                .as_ref()
                .map(|crs| format!(" -t_srs {}", render_crs(crs, config)))
                .unwrap_or_default();
            format!(
                "gdalwarp {}{} -dstnodata 0 -overwrite \"$tmp\" \"$lcc\"",
                warp_flags(warp),
                t_srs,
            )
        }
        Operation::Cleanup(artifact) => format!("rm {}", artifact_var(*artifact)),
        Operation::ReprojectRaster { resampling, target } => format!(
            "gdalwarp -r {} -t_srs {} -dstnodata 0 -overwrite \"$lcc\" \"$out\"",
            resampling,
            render_crs(target, config),
        ),
        Operation::Finalize => "mv \"$lcc\" \"$out\"".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::synth::synthesize;
    use crate::geo::synth::tests::captured;
    use crate::state::options::Settings;

    fn block_for(settings: &Settings, file_name: &str) -> String {
        let config = settings.snapshot().unwrap();
        let ops = synthesize(&captured(), &config);
        render_block(file_name, &config, &ops)
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("sheet 01.tif"), "'sheet 01.tif'");
        assert_eq!(shell_quote("it's.tif"), r"'it'\''s.tif'");
        assert_eq!(shell_quote("say \"hi\".tif"), "'say \"hi\".tif'");
    }

    #[test]
    fn test_geographic_block() {
        let mut settings = Settings::default();
        settings.preproject = false;
        let block = block_for(&settings, "sheet_01.tif");
        let lines: Vec<&str> = block.lines().collect();

        assert_eq!(lines[0], "src='sheet_01.tif'");
        assert_eq!(lines[1], "tmp='georeferenced/temp_sheet_01.tif'");
        assert_eq!(lines[3], "out='georeferenced/sheet_01.tif'");
        assert_eq!(lines[6], "GEO_SRS=\"EPSG:4269\"");
        assert_eq!(
            lines[8],
            "gdal_translate -of GTiff -a_srs \"$GEO_SRS\" \
             -gcp 102.250 98.500 -102.0 34.0 \
             -gcp 2001.000 101.125 -99.0 34.0 \
             -gcp 3900.000 97.000 -96.0 34.0 \
             -gcp 99.000 2903.333 -102.0 32.0 \
             -gcp 2000.500 2901.000 -99.0 32.0 \
             -gcp 3902.750 2899.500 -96.0 32.0 \
             \"$src\" \"$tmp\""
        );
        assert_eq!(
            lines[9],
            "gdalwarp -r cubic -order 2 -t_srs \"$LCC_PROJ\" -dstnodata 0 -overwrite \"$tmp\" \"$lcc\""
        );
        assert_eq!(lines[10], "rm \"$tmp\"");
        assert_eq!(lines[11], "mv \"$lcc\" \"$out\"");
        assert!(!block.contains("gdaltransform"));
        assert!(block.ends_with("mv \"$lcc\" \"$out\"\n\n"));
    }

    #[test]
    fn test_preprojected_block_with_target() {
        let mut settings = Settings::default();
        settings.target_crs = "3857".to_string();
        settings.resampling = crate::geo::operation::Resampling::Lanczos;
        settings.refine_tolerance = "2.5".to_string();
        settings.refine_min_gcps = "4".to_string();
        let block = block_for(&settings, "sheet_02.tif");

        assert!(block.contains(
            "read X1 Y1 _ <<< $(echo \"-102.0 34.0\" | gdaltransform -s_srs \"$GEO_SRS\" -t_srs \"$LCC_PROJ\")"
        ));
        assert!(block.contains("read X6 Y6 _ <<< $(echo \"-96.0 32.0\""));
        assert!(block.contains("-a_srs \"$LCC_PROJ\" -gcp 102.250 98.500 ${X1} ${Y1} -gcp"));
        assert!(block.contains(
            "gdalwarp -r lanczos -order 2 -refine_gcps 2.5 4 -dstnodata 0 -overwrite \"$tmp\" \"$lcc\""
        ));
        assert!(block.contains(
            "gdalwarp -r lanczos -t_srs EPSG:3857 -dstnodata 0 -overwrite \"$lcc\" \"$out\"\nrm \"$lcc\"\n\n"
        ));
        assert!(!block.contains("mv "));
    }

    #[test]
    fn test_quoted_file_name_is_escaped() {
        let block = block_for(&Settings::default(), "O'Brien \"county\".tif");
        assert!(block.starts_with("src='O'\\''Brien \"county\".tif'\n"));
        assert!(block.contains("tmp='georeferenced/temp_O'\\''Brien \"county\".tif'"));
    }

    #[test]
    fn test_other_geographic_crs_is_spelled_out() {
        let config = Settings::default().snapshot().unwrap();
        let op = Operation::ReprojectPoint {
            label: crate::state::data::PointLabel::TopMid,
            lon: "-99.0".to_string(),
            lat: "34.0".to_string(),
            from: Crs::Geographic(crate::geo::projection::Datum::Wgs84),
            to: Crs::Geographic(config.input_datum),
        };
        assert_eq!(
            render_operation(&op, &config),
            "read X2 Y2 _ <<< $(echo \"-99.0 34.0\" | gdaltransform -s_srs \"EPSG:4326\" -t_srs \"$GEO_SRS\")"
        );
    }

    #[test]
    fn test_tps_flag() {
        let mut settings = Settings::default();
        settings.warp_model = crate::geo::operation::WarpModel::Tps;
        let block = block_for(&settings, "a.tif");
        assert!(block.contains("gdalwarp -r cubic -tps -dstnodata 0"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let settings = Settings::default();
        assert_eq!(block_for(&settings, "a.tif"), block_for(&settings, "a.tif"));
    }
}
