mod fragment;
mod policy;
mod sim_time;
mod support;
mod task_driver;
