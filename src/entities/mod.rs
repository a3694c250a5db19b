pub mod box_office;
pub mod movie;
pub mod rating;
