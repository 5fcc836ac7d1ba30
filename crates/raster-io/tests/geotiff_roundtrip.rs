//! Write/read round trips through the GeoTIFF driver.

use std::fs;

use raster_io::{
    Compression, DataType, GeoTiffDriver, GeoTransform, RasterDriver, RasterGrid, RasterProfile,
    Reprojector, WarpReprojector,
};
use test_utils::{
    assert_slice_approx_eq, create_test_grid, synthetic_band, TileWorkspace, TILE_ORIGIN,
    UTM35N_EPSG,
};
use tile_common::Epsg;

fn utm_profile(width: usize, height: usize, pixel: f64) -> RasterProfile {
    RasterProfile::new(width, height)
        .with_transform(GeoTransform::north_up(
            TILE_ORIGIN.0,
            TILE_ORIGIN.1,
            pixel,
            pixel,
        ))
        .with_crs(Epsg::new(UTM35N_EPSG))
}

#[test]
fn test_float32_lzw_roundtrip() {
    let ws = TileWorkspace::new().unwrap();
    let path = ws.root().join("index.tif");
    let driver = GeoTiffDriver::new();

    let mut values = create_test_grid(16, 8);
    values[3] = f32::NAN;
    values[4] = -0.25;
    let grid = RasterGrid::new(values, 16, 8).unwrap();
    let profile = utm_profile(16, 8, 10.0).with_compression(Compression::Lzw);

    driver.write(&path, &grid, &profile).unwrap();
    let (read, read_profile) = driver.read(&path).unwrap();

    assert_eq!(read.shape(), (16, 8));
    assert_slice_approx_eq!(read.data(), grid.data(), 0.0);
    assert_eq!(read_profile.crs, Some(Epsg::new(UTM35N_EPSG)));
    assert_eq!(read_profile.transform, profile.transform);
    assert_eq!(read_profile.data_type, DataType::Float32);
    assert_eq!(read_profile.compression, Compression::Lzw);
}

#[test]
fn test_uint16_band_roundtrip_keeps_nodata() {
    let ws = TileWorkspace::new().unwrap();
    let path = ws.root().join("band.tif");
    let driver = GeoTiffDriver::new();

    let grid = RasterGrid::new(synthetic_band("04", 5, 4), 5, 4).unwrap();
    let profile = utm_profile(5, 4, 20.0)
        .with_data_type(DataType::UInt16)
        .with_nodata(Some(0.0));

    driver.write(&path, &grid, &profile).unwrap();
    let (read, read_profile) = driver.read(&path).unwrap();

    assert_eq!(read, grid);
    assert_eq!(read_profile.data_type, DataType::UInt16);
    assert_eq!(read_profile.nodata, Some(0.0));
    assert_eq!(read_profile.transform.pixel_size(), (20.0, 20.0));
}

#[test]
fn test_signed_integer_roundtrip() {
    let ws = TileWorkspace::new().unwrap();
    let driver = GeoTiffDriver::new();
    let values = vec![-32768.0, -1.0, 0.0, 1.0, 32767.0, f32::NAN];
    let grid = RasterGrid::new(values, 3, 2).unwrap();

    let profile = utm_profile(3, 2, 10.0)
        .with_data_type(DataType::Int16)
        .with_nodata(Some(-9999.0));
    let path = ws.root().join("int16.tif");
    driver.write(&path, &grid, &profile).unwrap();
    let (read, read_profile) = driver.read(&path).unwrap();
    assert_eq!(read_profile.data_type, DataType::Int16);
    assert_eq!(read.data(), &[-32768.0, -1.0, 0.0, 1.0, 32767.0, -9999.0]);

    let profile = profile.with_data_type(DataType::Int32);
    let path = ws.root().join("int32.tif");
    driver.write(&path, &grid, &profile).unwrap();
    let (read, read_profile) = driver.read(&path).unwrap();
    assert_eq!(read_profile.data_type, DataType::Int32);
    assert_eq!(read.get(0, 0), Some(-32768.0));
}

#[test]
fn test_concurrent_writes_to_one_path_stay_readable() {
    let ws = TileWorkspace::new().unwrap();
    let path = ws.root().join("shared_ndvi.tif");
    let driver = GeoTiffDriver::new();
    let profile = utm_profile(64, 64, 10.0);

    std::thread::scope(|scope| {
        for i in 0..8 {
            let path = &path;
            let profile = &profile;
            scope.spawn(move || {
                let grid = RasterGrid::filled(i as f32, 64, 64);
                for _ in 0..4 {
                    driver.write(path, &grid, profile).unwrap();
                }
            });
        }
    });

    let (read, _) = driver.read(&path).unwrap();
    let first = read.data()[0];
    assert!(read.data().iter().all(|&v| v == first));
    let names: Vec<_> = fs::read_dir(ws.root()).unwrap().collect();
    assert_eq!(names.len(), 1);
}

#[test]
fn test_read_profile_only() {
    let ws = TileWorkspace::new().unwrap();
    let path = ws.root().join("band.tif");
    let driver = GeoTiffDriver::new();

    let grid = RasterGrid::filled(1.0, 3, 2);
    driver.write(&path, &grid, &utm_profile(3, 2, 10.0)).unwrap();

    let profile = driver.read_profile(&path).unwrap();
    assert_eq!(profile.shape(), (3, 2));
    assert_eq!(profile.crs, Some(Epsg::new(UTM35N_EPSG)));
}

#[test]
fn test_rewrite_is_bit_identical() {
    let ws = TileWorkspace::new().unwrap();
    let path = ws.root().join("index.tif");
    let driver = GeoTiffDriver::new();

    let grid = RasterGrid::new(create_test_grid(8, 8), 8, 8).unwrap();
    let profile = utm_profile(8, 8, 10.0).with_compression(Compression::Lzw);

    driver.write(&path, &grid, &profile).unwrap();
    let first = fs::read(&path).unwrap();
    driver.write(&path, &grid, &profile).unwrap();
    let second = fs::read(&path).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_shape_mismatch_is_rejected() {
    let ws = TileWorkspace::new().unwrap();
    let path = ws.root().join("bad.tif");
    let driver = GeoTiffDriver::new();

    let grid = RasterGrid::filled(1.0, 3, 3);
    assert!(driver.write(&path, &grid, &utm_profile(4, 4, 10.0)).is_err());
    assert!(!path.exists());
}

#[test]
fn test_missing_file_fails_to_open() {
    let driver = GeoTiffDriver::new();
    let err = driver
        .read(std::path::Path::new("/nonexistent/band.tif"))
        .unwrap_err();
    assert!(matches!(err, raster_io::RasterError::OpenFailed { .. }));
}

#[test]
fn test_reproject_file_to_tm35fin() {
    let ws = TileWorkspace::new().unwrap();
    let source = ws.root().join("tile.tif");
    let out_dir = ws.root().join("Reprojected");
    fs::create_dir_all(&out_dir).unwrap();
    let driver = GeoTiffDriver::new();

    let grid = RasterGrid::new(synthetic_band("08", 12, 12), 12, 12).unwrap();
    let profile = utm_profile(12, 12, 10.0).with_data_type(DataType::UInt16);
    driver.write(&source, &grid, &profile).unwrap();

    let reprojector = WarpReprojector::new(driver);
    let output = reprojector
        .reproject(&source, Epsg::ETRS_TM35FIN, &out_dir)
        .unwrap();

    assert_eq!(output, out_dir.join("tile.tif"));
    let read_profile = driver.read_profile(&output).unwrap();
    assert_eq!(read_profile.crs, Some(Epsg::ETRS_TM35FIN));
    assert_eq!(read_profile.shape(), (12, 12));
    assert_eq!(read_profile.data_type, DataType::UInt16);
}

#[test]
fn test_reproject_in_place_replaces_source() {
    let ws = TileWorkspace::new().unwrap();
    let dir = ws.tile_dir("tiles").unwrap();
    let source = dir.join("tile.tif");
    let driver = GeoTiffDriver::new();

    let grid = RasterGrid::new(synthetic_band("04", 6, 6), 6, 6).unwrap();
    driver
        .write(&source, &grid, &utm_profile(6, 6, 10.0).with_data_type(DataType::UInt16))
        .unwrap();

    let output = WarpReprojector::new(driver)
        .reproject(&source, Epsg::ETRS_TM35FIN, &dir)
        .unwrap();

    assert_eq!(output, source);
    assert_eq!(
        driver.read_profile(&source).unwrap().crs,
        Some(Epsg::ETRS_TM35FIN)
    );
    let leftovers: Vec<_> = fs::read_dir(&dir).unwrap().collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn test_reproject_signed_tile() {
    let ws = TileWorkspace::new().unwrap();
    let dir = ws.tile_dir("dem").unwrap();
    let source = dir.join("dem.tif");
    let driver = GeoTiffDriver::new();

    let values: Vec<f32> = (0..36).map(|i| i as f32 - 18.0).collect();
    let grid = RasterGrid::new(values, 6, 6).unwrap();
    driver
        .write(&source, &grid, &utm_profile(6, 6, 10.0).with_data_type(DataType::Int16))
        .unwrap();

    let output_dir = ws.tile_dir("reprojected").unwrap();
    let output = WarpReprojector::new(driver)
        .reproject(&source, Epsg::ETRS_TM35FIN, &output_dir)
        .unwrap();

    let profile = driver.read_profile(&output).unwrap();
    assert_eq!(profile.data_type, DataType::Int16);
    assert_eq!(profile.crs, Some(Epsg::ETRS_TM35FIN));
}
