use serde::Serialize;

use crate::{interceptor::InterceptorAction, sim::SimulationView};

#[derive(Debug, Serialize, PartialEq)]
pub struct ObjectStateOut {
    pub sim_time: f64, // Simulation time
    pub id: String,
    pub name: String,
    pub class: String,
    pub lat: f64,
    pub long: f64,
    pub altitude: f64,                   // km
    pub velocity: f64,                   // km/s
    pub threat_level: String,
    pub collision_probability: f64,
    pub time_to_impact: Option<f64>,     // hours
    pub period: Option<f64>,             // min
}

#[derive(Debug, Serialize, PartialEq)]
pub struct InterceptorOut {
    pub id: String,
    pub target_object_id: String,
    pub target_name: String,
    pub status: String,
    pub deployment_time: String,
    pub distance_to_target: f64,       // km
    pub estimated_intercept_time: f64, // min
}

pub trait SimulationOutput {
    fn write_out_object_state(&mut self, object_state: ObjectStateOut) -> Result<(), csv::Error>;

    fn write_out_interceptor(&mut self, interceptor: InterceptorOut) -> Result<(), csv::Error>;

    fn flush(&mut self) -> Result<(), csv::Error>;
}

pub mod csv_output {
    use super::{InterceptorOut, ObjectStateOut, SimulationOutput};
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    pub struct CSVController<W: io::Write> {
        object_state_writer: csv::Writer<W>,
        interceptor_writer: csv::Writer<W>,
    }

    impl CSVController<fs::File> {
        /// Create the output files inside a new timestamped sub-directory of `dir_filepath`.
        ///
        /// ### Return
        ///     The controller and the directory it writes into.
        ///
        pub fn new(dir_filepath: &Path) -> Result<(Self, PathBuf), csv::Error> {
            let sub_dirpath = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
            let full_dirpath = dir_filepath.join(sub_dirpath);
            fs::create_dir_all(full_dirpath.as_path())?;

            let controller = CSVController {
                object_state_writer: csv::Writer::from_path(
                    full_dirpath.join("nova_object_states.csv"),
                )?,
                interceptor_writer: csv::Writer::from_path(
                    full_dirpath.join("nova_interceptors.csv"),
                )?,
            };

            Ok((controller, full_dirpath))
        }
    }

    #[cfg(test)]
    impl<W: io::Write> CSVController<W> {
        pub fn from_writers(object_states: W, interceptors: W) -> Self {
            CSVController {
                object_state_writer: csv::Writer::from_writer(object_states),
                interceptor_writer: csv::Writer::from_writer(interceptors),
            }
        }

        pub fn into_inner(self) -> Result<(W, W), csv::Error> {
            let objects = self
                .object_state_writer
                .into_inner()
                .map_err(|e| csv::Error::from(e.into_error()))?;
            let interceptors = self
                .interceptor_writer
                .into_inner()
                .map_err(|e| csv::Error::from(e.into_error()))?;

            Ok((objects, interceptors))
        }
    }

    impl<W: io::Write> SimulationOutput for CSVController<W> {
        fn write_out_object_state(&mut self, object_state: ObjectStateOut) -> Result<(), csv::Error> {
            self.object_state_writer.serialize(object_state)
        }

        fn write_out_interceptor(&mut self, interceptor: InterceptorOut) -> Result<(), csv::Error> {
            self.interceptor_writer.serialize(interceptor)
        }

        fn flush(&mut self) -> Result<(), csv::Error> {
            self.object_state_writer.flush()?;
            self.interceptor_writer.flush()?;
            Ok(())
        }
    }
}

pub fn write_out_view(
    view: &SimulationView,
    output_controller: &mut dyn SimulationOutput,
) -> Result<(), csv::Error> {
    for obj in &view.objects {
        output_controller.write_out_object_state(obj.to_output_form(view.sim_time_s))?;
    }
    output_controller.flush()
}

pub fn write_out_interceptors(
    interceptors: &[InterceptorAction],
    output_controller: &mut dyn SimulationOutput,
) -> Result<(), csv::Error> {
    for interceptor in interceptors {
        output_controller.write_out_interceptor(interceptor.to_output_form())?;
    }
    output_controller.flush()
}

#[cfg(test)]
mod tests {
    use super::csv_output::CSVController;
    use super::*;
    use crate::bodies::sim_object::{CatalogRecord, OrbitalObject};
    use crate::interceptor::InterceptorStatus;

    #[test]
    fn test_write_out_view() {
        let mut obj = OrbitalObject::from_record(&CatalogRecord {
            id: "obj-1".to_string(),
            name: "COSMOS 2251 DEB".to_string(),
            ..Default::default()
        });
        obj.state.altitude = 780.0;
        let view = SimulationView {
            sim_time_s: 3.0,
            step_count: 3,
            objects: vec![obj],
            active_threats: vec![],
        };

        let mut controller = CSVController::from_writers(Vec::new(), Vec::new());
        write_out_view(&view, &mut controller).unwrap();
        let (objects, interceptors) = controller.into_inner().unwrap();
        let text = String::from_utf8(objects).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "sim_time,id,name,class,lat,long,altitude,velocity,threat_level,collision_probability,time_to_impact,period"
        );
        assert_eq!(
            lines.next().unwrap(),
            "3.0,obj-1,COSMOS 2251 DEB,unknown,0.0,0.0,780.0,7.5,none,0.0,,"
        );
        assert!(interceptors.is_empty());
    }

    #[test]
    fn test_write_out_interceptors() {
        let action = InterceptorAction {
            id: "act-1".to_string(),
            created_date: None,
            target_object_id: "obj-1".to_string(),
            target_name: "FENGYUN 1C DEB".to_string(),
            deployment_time: chrono::DateTime::parse_from_rfc3339("2025-10-04T12:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
            status: InterceptorStatus::Approaching,
            distance_to_target: 12.5,
            estimated_intercept_time: 240.0,
        };

        let mut controller = CSVController::from_writers(Vec::new(), Vec::new());
        write_out_interceptors(&[action], &mut controller).unwrap();
        let (_, interceptors) = controller.into_inner().unwrap();
        let text = String::from_utf8(interceptors).unwrap();

        assert_eq!(
            text.lines().nth(1).unwrap(),
            "act-1,obj-1,FENGYUN 1C DEB,approaching,2025-10-04T12:00:00+00:00,12.5,240.0"
        );
    }
}
