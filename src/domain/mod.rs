// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Order composition and aggregation. Account and product records are owned
// by other services and live with their lookups in `crate::collaborators`.
//
// ============================================================================

pub mod order;
