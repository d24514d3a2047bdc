pub mod hvac_control;
