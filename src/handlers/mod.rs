// handlers/mod.rs - two security tiers
//
// Public (no auth) → Protected (JWT + user validation)
pub mod public; // /auth/*
pub mod protected; // /api/*
