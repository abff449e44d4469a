// Copyright @yucwang 2026

#![allow(dead_code)]

pub extern crate nalgebra as na;

pub mod core;
pub mod math;
pub mod io;
pub mod octree;
pub mod sensors;
pub mod integrators;
pub mod materials;
pub mod renderers;
pub mod shapes;
