pub mod color;
pub mod config;
pub mod dispersion;
pub mod fresnel;
pub mod geom;
pub mod laser;
pub mod logger;
pub mod medium;
pub mod output;
pub mod powers;
pub mod propagation;
pub mod ray;
pub mod settings;
pub mod simulation;
pub mod snell;
pub mod view;
pub mod wave;
