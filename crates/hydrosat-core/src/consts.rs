/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Square metres per hectare.
pub const M2_PER_HECTARE: f64 = 10_000.0;

/// Surface-reflectance products are only available from this year on.
/// Earlier windows fall back to top-of-atmosphere scenes.
pub const SURFACE_REFLECTANCE_FIRST_YEAR: i32 = 2019;

/// Scene classification (SCL) values masked out of surface-reflectance
/// scenes: 3 = cloud shadow, 8 = medium-probability cloud,
/// 9 = high-probability cloud, 10 = thin cirrus.
pub const MASKED_SCENE_CLASSES: [u8; 4] = [3, 8, 9, 10];

/// Default maximum scene cloud cover (percent) for classification runs.
pub const DEFAULT_MAX_CLOUD_PCT: f32 = 30.0;

/// Default per-call timeout against the imagery backend.
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 120;

/// Pixel budget for the area reducer before it switches to sampling.
pub const DEFAULT_MAX_PIXELS: u64 = 100_000_000;

/// Vector payloads with more features than this are omitted.
pub const DEFAULT_MAX_VECTOR_FEATURES: usize = 2_000;

/// Douglas-Peucker tolerance, in map units, applied to traced polygons.
pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 50.0;

/// Problematic share (percent) above which a watershed is flagged as elevated.
pub const ELEVATED_PROBLEMATIC_PCT: f64 = 10.0;

/// Default problematic share (percent) for a critical watershed alert.
pub const DEFAULT_CRITICAL_PROBLEMATIC_PCT: f64 = 20.0;

/// |Δ problematic %| above which a change is significant.
pub const SIGNIFICANT_TREND_DELTA_PCT: f64 = 5.0;

/// |Δ problematic %| above which a change is slight (and at most significant).
pub const SLIGHT_TREND_DELTA_PCT: f64 = 1.0;

/// Dashboard summary lifetime.
pub const DEFAULT_DASHBOARD_TTL_SECS: u64 = 300;

/// Trailing window summarised by the dashboard.
pub const DEFAULT_DASHBOARD_DAYS_BACK: i64 = 30;

/// Number of alerts embedded in the dashboard summary.
pub const DASHBOARD_TOP_ALERTS: usize = 5;

/// Wall-clock limit for a background job.
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 600;

/// Worker threads in the background job pool.
pub const DEFAULT_JOB_WORKERS: usize = 2;

/// Total area of the consortium zone in hectares.
pub const CONSORTIUM_AREA_HA: f64 = 88_277.0;

/// Metres per degree of latitude (mean).
pub const METRES_PER_DEGREE_LAT: f64 = 110_574.0;

/// Metres per degree of longitude at the equator.
pub const METRES_PER_DEGREE_LON: f64 = 111_320.0;
