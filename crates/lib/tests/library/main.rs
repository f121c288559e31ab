mod build_tests;
mod common;
mod lua_tests;
