mod lifecycle;
mod traffic;
