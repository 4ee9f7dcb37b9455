//! Integration test package for the sizewatch workspace.
