pub mod fake_jenkins;
