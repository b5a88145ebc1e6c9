pub mod resumes;
pub mod session;
