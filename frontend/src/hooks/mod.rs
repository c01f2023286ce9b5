pub mod use_branches;
