pub mod ocpp_frame;
