// Port configuration
pub const DEFAULT_PORT: u16 = 3010;
pub const PORT_ENV_VAR: &str = "HUBMAP_PORT";

// Map frame, in percent of the SVG viewport
pub const MAP_CENTER: f64 = 50.0;
pub const MIN_COORD: f64 = 2.0;
pub const MAX_COORD: f64 = 98.0;

// Projection tuning
pub const VERTICAL_STRETCH: f64 = 1.2;
pub const MIN_WEIGHT_DISTANCE: f64 = 0.01;

// Fallback ring for hubs without coordinates
pub const FALLBACK_RADIUS: f64 = 35.0;
pub const CROWDED_RADIUS_SHRINK: f64 = 10.0;
pub const CROWDED_HUB_COUNT: usize = 10;
pub const ODD_INDEX_RADIUS_BUMP: f64 = 5.0;

// Connection lines
pub const DEFAULT_CONNECTION_THRESHOLD: f64 = 30.0;
pub const DEFAULT_CONNECTION_GATE: f64 = 0.6;
pub const MIN_CONNECTION_STRENGTH: f64 = 0.2;
pub const MAX_CONNECTION_STRENGTH: f64 = 0.8;

// Store cache
pub const CACHE_VERSION: u32 = 1;
pub const CACHE_FILE_NAME: &str = "hubs_v1.bin";
