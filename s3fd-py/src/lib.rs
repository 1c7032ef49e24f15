//! Python bindings for the s3fd post-processing library.
//!
//! The Python host runs the network and hands its twelve output arrays to
//! `Detector.detect_batch`, which returns one list of `Detection` per image.

use numpy::{
    PyArray1, PyArray4, PyArrayMethods, PyReadonlyArray2, PyReadonlyArray4, PyUntypedArrayMethods,
};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use s3fd::{
    DetectConfig as RustDetectConfig, Detection as RustDetection, Detector as RustDetector,
    S3fdError, ScaleOutput, TensorView, NUM_SCALES,
};

/// Convert an S3fdError to a Python exception.
fn to_py_err(err: S3fdError) -> PyErr {
    match err {
        S3fdError::ImageIo { .. } | S3fdError::IndexOutOfBounds { .. } => {
            PyRuntimeError::new_err(err.to_string())
        }
        _ => PyValueError::new_err(err.to_string()),
    }
}

fn shape4(dims: &[usize]) -> [usize; 4] {
    [dims[0], dims[1], dims[2], dims[3]]
}

/// Face box in network-input pixel coordinates.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    #[pyo3(get)]
    pub x1: f32,
    #[pyo3(get)]
    pub y1: f32,
    #[pyo3(get)]
    pub x2: f32,
    #[pyo3(get)]
    pub y2: f32,
    /// Face probability in [0, 1].
    #[pyo3(get)]
    pub score: f32,
}

#[pymethods]
impl Detection {
    /// Return the box as an (x1, y1, x2, y2, score) tuple.
    fn to_tuple(&self) -> (f32, f32, f32, f32, f32) {
        (self.x1, self.y1, self.x2, self.y2, self.score)
    }

    fn __repr__(&self) -> String {
        format!(
            "Detection(x1={:.1}, y1={:.1}, x2={:.1}, y2={:.1}, score={:.4})",
            self.x1, self.y1, self.x2, self.y2, self.score
        )
    }
}

impl From<RustDetection> for Detection {
    fn from(d: RustDetection) -> Self {
        Self {
            x1: d.x1,
            y1: d.y1,
            x2: d.x2,
            y2: d.y2,
            score: d.score,
        }
    }
}

/// Post-processing configuration.
#[pyclass]
#[derive(Clone)]
pub struct DetectConfig {
    inner: RustDetectConfig,
}

#[pymethods]
impl DetectConfig {
    /// Create a new DetectConfig.
    ///
    /// Args:
    ///     confidence: Minimum face probability (default: 0.7)
    ///     nms_threshold: IoU above which boxes merge (default: 0.5)
    ///     coarse_threshold: Cheap pre-filter on face probability (default: 0.05)
    ///     variances: (center, size) offset variances (default: (0.1, 0.2))
    ///     parallel: Process batch images in parallel (default: False)
    #[new]
    #[pyo3(signature = (
        confidence = 0.7,
        nms_threshold = 0.5,
        coarse_threshold = 0.05,
        variances = (0.1, 0.2),
        parallel = false
    ))]
    fn new(
        confidence: f32,
        nms_threshold: f32,
        coarse_threshold: f32,
        variances: (f32, f32),
        parallel: bool,
    ) -> PyResult<Self> {
        let inner = RustDetectConfig {
            confidence,
            nms_threshold,
            coarse_threshold,
            variances: [variances.0, variances.1],
            parallel,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Build a config from the host's percentage confidence setting.
    #[staticmethod]
    fn from_percent(confidence_percent: f32) -> PyResult<Self> {
        let inner = RustDetectConfig::default().with_confidence_percent(confidence_percent);
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn __repr__(&self) -> String {
        format!(
            "DetectConfig(confidence={}, nms_threshold={}, coarse_threshold={}, variances=({}, {}), parallel={})",
            self.inner.confidence,
            self.inner.nms_threshold,
            self.inner.coarse_threshold,
            self.inner.variances[0],
            self.inner.variances[1],
            self.inner.parallel
        )
    }
}

/// S3FD post-processor.
#[pyclass]
pub struct Detector {
    inner: RustDetector,
}

#[pymethods]
impl Detector {
    /// Create a detector.
    ///
    /// Args:
    ///     config: DetectConfig (default: DetectConfig())
    #[new]
    #[pyo3(signature = (config = None))]
    fn new(config: Option<DetectConfig>) -> PyResult<Self> {
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        cfg.validate().map_err(to_py_err)?;
        Ok(Self {
            inner: RustDetector::new().with_config(cfg),
        })
    }

    /// Decode raw network outputs for a whole batch.
    ///
    /// Args:
    ///     outputs: 12 float32 arrays shaped (N, H, W, C) in
    ///         [cls1, reg1, ..., cls6, reg6] order
    ///
    /// Returns:
    ///     One list of Detection per image, best score first
    fn detect_batch(&self, outputs: Vec<PyReadonlyArray4<'_, f32>>) -> PyResult<Vec<Vec<Detection>>> {
        if outputs.len() != NUM_SCALES * 2 {
            return Err(PyValueError::new_err(format!(
                "expected {} arrays (cls/reg per scale), got {}",
                NUM_SCALES * 2,
                outputs.len()
            )));
        }

        let mut scales = Vec::with_capacity(NUM_SCALES);
        for pair in outputs.chunks_exact(2) {
            let cls =
                TensorView::new(pair[0].as_slice()?, shape4(pair[0].shape())).map_err(to_py_err)?;
            let reg =
                TensorView::new(pair[1].as_slice()?, shape4(pair[1].shape())).map_err(to_py_err)?;
            scales.push(ScaleOutput::new(cls, reg));
        }

        let batches = self.inner.detect_batch(&scales).map_err(to_py_err)?;
        Ok(batches
            .into_iter()
            .map(|dets| dets.into_iter().map(Detection::from).collect())
            .collect())
    }

    fn __repr__(&self) -> String {
        format!("Detector(confidence={})", self.inner.config().confidence)
    }
}

/// Score-weighted non-maximum suppression.
///
/// Args:
///     boxes: float32 array shaped (N, 5) with rows (x1, y1, x2, y2, score)
///     threshold: IoU above which boxes merge (default: 0.5)
///
/// Returns:
///     Retained detections, best score first
#[pyfunction]
#[pyo3(signature = (boxes, threshold = 0.5))]
fn weighted_nms(boxes: PyReadonlyArray2<'_, f32>, threshold: f32) -> PyResult<Vec<Detection>> {
    let shape = boxes.shape();
    if shape[1] != 5 {
        return Err(PyValueError::new_err("boxes must have shape (N, 5)"));
    }
    let dets: Vec<RustDetection> = boxes
        .as_slice()?
        .chunks_exact(5)
        .map(|row| RustDetection::new(row[0], row[1], row[2], row[3], row[4]))
        .collect();
    Ok(s3fd::weighted_nms(&dets, threshold)
        .into_iter()
        .map(Detection::from)
        .collect())
}

/// Subtract the BGR training mean from a uint8 (N, H, W, 3) batch.
///
/// Returns:
///     float32 array with the same shape, ready to feed the network
#[pyfunction]
fn prepare_batch<'py>(
    py: Python<'py>,
    batch: PyReadonlyArray4<'py, u8>,
) -> PyResult<Bound<'py, PyArray4<f32>>> {
    let shape = shape4(batch.shape());
    let tensor = s3fd::prepare_batch(batch.as_slice()?, shape).map_err(to_py_err)?;
    PyArray1::from_vec(py, tensor.into_data()).reshape(shape)
}

/// Load an image file as a (1, size, size, 3) network feed.
///
/// Args:
///     path: Path to an image file
///     input_size: Side of the square network input (default: 640)
#[pyfunction]
#[pyo3(signature = (path, input_size = 640))]
fn load_input<'py>(
    py: Python<'py>,
    path: &str,
    input_size: u32,
) -> PyResult<Bound<'py, PyArray4<f32>>> {
    let (tensor, _geometry) = s3fd::io::load_input(path, input_size).map_err(to_py_err)?;
    let shape = tensor.shape();
    PyArray1::from_vec(py, tensor.into_data()).reshape(shape)
}

/// Python module for s3fd post-processing.
#[pymodule]
fn _s3fd(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_class::<DetectConfig>()?;
    m.add_class::<Detector>()?;
    m.add_function(wrap_pyfunction!(weighted_nms, m)?)?;
    m.add_function(wrap_pyfunction!(prepare_batch, m)?)?;
    m.add_function(wrap_pyfunction!(load_input, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
