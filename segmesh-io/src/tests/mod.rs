//! Test modules for segmesh-io
//!
//! Volume loading is exercised against NIfTI files synthesized on the fly;
//! mesh dispatch against scratch directories.
